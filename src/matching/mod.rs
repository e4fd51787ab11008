//! Sequence comparison and ranking.
//!
//! - [`PairwiseAligner`]: The alignment primitive; [`LocalAligner`] wraps rust-bio
//! - [`RecursiveMatcher`]: Divide-and-conquer comparison of long sequences
//! - [`SearchEngine`]: Ranks every reference against a query on a bounded worker pool
//! - [`CancelToken`]: Cooperative cancellation and deadlines for long comparisons
//!
//! ## Comparison
//!
//! Aligning two long sequences directly is quadratic in time and memory. When
//! either sequence is longer than the leaf size (1800 bases by default) both are
//! split at their midpoints, the left and right halves are compared
//! independently, and the scores are summed. This is an approximation, not an
//! optimal alignment, and it assumes the two sequences are roughly collinear.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_kin::catalog::cluster::ClusterConfig;
//! use seq_kin::catalog::store::Database;
//! use seq_kin::matching::{CancelToken, SearchConfig, SearchEngine};
//! use std::path::Path;
//!
//! let database = Database::load_and_cluster(Path::new("viruses"), &ClusterConfig::default()).unwrap();
//! let engine = SearchEngine::for_database(&database, SearchConfig::default());
//! let ranking = engine.rank(b"ACGTTGCA", &CancelToken::new()).unwrap();
//!
//! for m in &ranking.matches {
//!     println!("{}: {:.2}", m.name, m.score);
//! }
//! ```

pub mod aligner;
pub mod cancel;
pub mod engine;
pub mod recursive;

pub use aligner::{AlignmentResult, LocalAligner, PairwiseAligner, ScoringParams};
pub use cancel::{CancelToken, Interrupted};
pub use engine::{Match, Ranking, SearchConfig, SearchEngine, SearchError, TaskFault};
pub use recursive::RecursiveMatcher;
