//! Cooperative cancellation for long-running comparisons.
//!
//! A [`CancelToken`] is shared by every task of one operation. Tasks call
//! [`CancelToken::check`] between recursion levels; an alignment call that has
//! already started always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a comparison stopped early
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation was cancelled")]
    Cancelled,

    #[error("operation exceeded its time limit")]
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never cancelled unless [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A new token that times out `timeout` from now
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Child token sharing this token's cancellation flag, with a deadline no
    /// later than `timeout` from now
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let child_deadline = Instant::now().checked_add(timeout);
        let deadline = match (self.deadline, child_deadline) {
            (Some(parent), Some(child)) => Some(parent.min(child)),
            (parent, child) => parent.or(child),
        };

        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Cancel this token and every token derived from it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// # Errors
    ///
    /// Returns `Interrupted::Cancelled` once cancelled, or `Interrupted::TimedOut`
    /// once the deadline has passed. Cancellation wins when both apply.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted::Cancelled)
        } else if self.is_expired() {
            Err(Interrupted::TimedOut)
        } else {
            Ok(())
        }
    }
}
