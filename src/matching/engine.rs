use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::store::{Database, ReferenceCollection};
use crate::core::family::FamilyAssignment;
use crate::core::sequence::Sequence;
use crate::core::types::{round_score, FamilyId};
use crate::matching::aligner::{AlignmentResult, LocalAligner, PairwiseAligner, ScoringParams};
use crate::matching::cancel::{CancelToken, Interrupted};
use crate::matching::recursive::{RecursiveMatcher, DEFAULT_MIN_LENGTH};

/// Default minimum score for a reference to be reported as a match
pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Default number of concurrent alignment workers
pub const DEFAULT_WORKERS: usize = 6;

/// Default number of aligned characters kept in match previews
pub const DEFAULT_PREVIEW_LENGTH: usize = 100;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No DNA sequences found in the database")]
    EmptyCollection,

    #[error("No valid DNA sequence found in the query: {0}")]
    InvalidQuery(String),

    #[error("No matches found above the threshold ({threshold})")]
    NoMatch { threshold: f64, faults: usize },

    #[error("All {0} alignment tasks failed")]
    AllTasksFailed(usize),

    #[error("Search stopped early: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start alignment workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SearchError {
    /// Conditions that describe the input or the data rather than a fault in the search
    #[must_use]
    pub fn is_reported_condition(&self) -> bool {
        matches!(
            self,
            Self::EmptyCollection | Self::InvalidQuery(_) | Self::NoMatch { .. }
        )
    }
}

/// Configuration for the search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum score for a reference to be retained
    pub threshold: f64,
    /// Leaf size for the divide-and-conquer comparison
    pub min_length: usize,
    /// Size of the alignment worker pool
    pub workers: usize,
    /// Per-reference time limit; an overrunning comparison is dropped
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    /// Time limit for the whole search
    #[serde(default)]
    pub search_timeout_ms: Option<u64>,
    /// Characters of each aligned fragment kept in a match
    pub preview_length: usize,
    pub scoring: ScoringParams,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
            workers: DEFAULT_WORKERS,
            task_timeout_ms: None,
            search_timeout_ms: None,
            preview_length: DEFAULT_PREVIEW_LENGTH,
            scoring: ScoringParams::default(),
        }
    }
}

impl SearchConfig {
    /// # Errors
    ///
    /// Returns `SearchError::InvalidConfig` for a non-finite threshold, an empty
    /// worker pool, or invalid scoring parameters.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.threshold.is_finite() {
            return Err(SearchError::InvalidConfig(
                "threshold must be a finite number".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(SearchError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        self.scoring.validate().map_err(SearchError::InvalidConfig)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    /// A fresh token honouring the whole-search time limit
    pub fn cancel_token(&self) -> CancelToken {
        match self.search_timeout_ms {
            Some(ms) => CancelToken::with_deadline(Duration::from_millis(ms)),
            None => CancelToken::new(),
        }
    }
}

/// A reference that reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub name: String,
    /// Score rounded to two decimal places
    pub score: f64,
    pub aligned_query: String,
    pub aligned_reference: String,
}

impl Match {
    fn from_alignment(name: &str, result: &AlignmentResult, preview_length: usize) -> Self {
        Self {
            name: name.to_string(),
            score: round_score(result.score),
            aligned_query: preview(&result.aligned_a, preview_length),
            aligned_reference: preview(&result.aligned_b, preview_length),
        }
    }
}

/// Fragments are ASCII, so byte truncation is safe
pub(crate) fn preview(fragment: &str, limit: usize) -> String {
    if fragment.len() <= limit {
        fragment.to_string()
    } else {
        format!("{}...", &fragment[..limit])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskFaultKind {
    Panicked(String),
    TimedOut,
}

/// A comparison that was dropped from the ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFault {
    pub name: String,
    #[serde(flatten)]
    pub kind: TaskFaultKind,
}

/// Ranked matches for one query
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    /// Sorted by score descending; equal scores keep collection order
    pub matches: Vec<Match>,
    /// Family of the top match
    pub best_family: Option<FamilyId>,
    pub faults: Vec<TaskFault>,
    /// Number of references compared
    pub compared: usize,
}

impl Ranking {
    pub fn best(&self) -> Option<&Match> {
        self.matches.first()
    }
}

enum TaskOutcome {
    Scored(AlignmentResult),
    Fault(TaskFaultKind),
}

/// Ranks every reference in a collection against a query
pub struct SearchEngine<'a> {
    collection: &'a ReferenceCollection,
    families: &'a FamilyAssignment,
    config: SearchConfig,
    aligner: Box<dyn PairwiseAligner>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        collection: &'a ReferenceCollection,
        families: &'a FamilyAssignment,
        config: SearchConfig,
    ) -> Self {
        let aligner = Box::new(LocalAligner::new(config.scoring));
        Self {
            collection,
            families,
            config,
            aligner,
        }
    }

    pub fn for_database(database: &'a Database, config: SearchConfig) -> Self {
        Self::new(&database.collection, &database.families, config)
    }

    /// Replace the alignment primitive
    #[must_use]
    pub fn with_aligner(mut self, aligner: impl PairwiseAligner + 'static) -> Self {
        self.aligner = Box::new(aligner);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Compare `query` against every reference on a bounded worker pool.
    ///
    /// Each comparison runs behind its own panic boundary and optional time
    /// limit; a failed comparison is logged and left out of the ranking.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::EmptyCollection` without starting any workers when
    /// there are no references, `SearchError::NoMatch` when nothing reaches the
    /// threshold, `SearchError::AllTasksFailed` when every comparison faulted,
    /// and `SearchError::Interrupted` when `cancel` fires.
    pub fn rank(&self, query: &[u8], cancel: &CancelToken) -> Result<Ranking, SearchError> {
        self.config.validate()?;

        if self.collection.is_empty() {
            return Err(SearchError::EmptyCollection);
        }
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query sequence is empty".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("seq-kin-align-{i}"))
            .build()?;

        let matcher = RecursiveMatcher::new(self.aligner.as_ref(), self.config.min_length);
        let references: Vec<&Sequence> = self.collection.iter().collect();

        debug!(
            "Ranking query of {} bases against {} references with {} workers",
            query.len(),
            references.len(),
            self.config.workers
        );

        let outcomes: Vec<Result<TaskOutcome, Interrupted>> = pool.install(|| {
            references
                .par_iter()
                .map(|reference| self.run_task(&matcher, query, reference, cancel))
                .collect()
        });
        let outcomes = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mut matches = Vec::new();
        let mut faults = Vec::new();
        for (reference, outcome) in references.iter().zip(outcomes) {
            match outcome {
                TaskOutcome::Scored(result) if result.score >= self.config.threshold => {
                    matches.push(Match::from_alignment(
                        reference.name(),
                        &result,
                        self.config.preview_length,
                    ));
                }
                TaskOutcome::Scored(_) => {}
                TaskOutcome::Fault(kind) => faults.push(TaskFault {
                    name: reference.name().to_string(),
                    kind,
                }),
            }
        }

        if faults.len() == references.len() {
            return Err(SearchError::AllTasksFailed(faults.len()));
        }

        // Stable sort: equal scores keep collection order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));

        let Some(best) = matches.first() else {
            return Err(SearchError::NoMatch {
                threshold: self.config.threshold,
                faults: faults.len(),
            });
        };
        let best_family = self.families.family_of(&best.name).cloned();

        info!(
            "{} of {} references matched; best {} ({}) in {}",
            matches.len(),
            references.len(),
            best.name,
            best.score,
            best_family.as_ref().map_or("no family", FamilyId::as_str)
        );

        Ok(Ranking {
            matches,
            best_family,
            faults,
            compared: references.len(),
        })
    }

    /// One comparison. `Err` only when the whole search was interrupted.
    fn run_task(
        &self,
        matcher: &RecursiveMatcher<'_>,
        query: &[u8],
        reference: &Sequence,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, Interrupted> {
        let token = match self.config.task_timeout() {
            Some(timeout) => cancel.with_timeout(timeout),
            None => cancel.clone(),
        };

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            matcher.match_pair(query, reference.bases(), &token)
        }));

        match attempt {
            Ok(Ok(result)) => Ok(TaskOutcome::Scored(result)),
            Ok(Err(interrupted)) => {
                // The search as a whole stopped; not this task's fault
                cancel.check()?;
                warn!(
                    "Comparison against {} stopped ({interrupted}); excluding it",
                    reference.name()
                );
                Ok(TaskOutcome::Fault(TaskFaultKind::TimedOut))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    "Comparison against {} failed: {message}; excluding it",
                    reference.name()
                );
                Ok(TaskOutcome::Fault(TaskFaultKind::Panicked(message)))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
