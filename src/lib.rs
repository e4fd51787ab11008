//! # seq-kin
//!
//! A library for finding the closest relatives of a DNA sequence in a
//! collection of reference sequences, and for grouping those references into
//! families of similar sequences.
//!
//! A directory of FASTA files is loaded once into a [`Database`]: the
//! reference collection plus a family assignment computed by comparing every
//! reference against the founder of each family. A query is then compared
//! against every reference in parallel, and the references that score at or
//! above a threshold are ranked together with the family of the best one.
//!
//! ## Features
//!
//! - **Local alignment**: Smith-Waterman with affine gaps via rust-bio
//! - **Divide-and-conquer**: Long sequences are split at their midpoints so no
//!   single alignment exceeds a fixed size
//! - **Bounded parallelism**: A fixed-size worker pool with per-task panic
//!   isolation, timeouts and cancellation
//! - **Family clustering**: Single-pass grouping against family founders
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_kin::{load_and_cluster, search, ClusterConfig, SearchConfig};
//! use std::path::Path;
//!
//! let database = load_and_cluster(Path::new("viruses"), &ClusterConfig::default()).unwrap();
//! let ranking = search(b"ACGTTGCAAC", &database, &SearchConfig::default()).unwrap();
//!
//! for m in &ranking.matches {
//!     println!("{}: {:.2}", m.name, m.score);
//! }
//! println!("closest family: {:?}", ranking.best_family);
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Reference collection loading and family clustering
//! - [`core`]: Core data types for sequences and families
//! - [`matching`]: Alignment, recursive matching and the parallel ranker
//! - [`parsing`]: FASTA parsing for references and queries
//! - [`report`]: Search reports
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: Web server for browser-based search

use std::path::Path;

pub mod catalog;
pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod report;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use catalog::cluster::ClusterConfig;
pub use catalog::store::{CatalogError, Database, ReferenceCollection};
pub use core::family::FamilyAssignment;
pub use core::sequence::Sequence;
pub use core::types::*;
pub use matching::engine::{Match, Ranking, SearchConfig, SearchEngine, SearchError};
pub use report::SearchReport;

/// Load a directory of FASTA files and group its sequences into families
///
/// # Errors
///
/// Returns `CatalogError` if the directory cannot be read or parsed, or the
/// configuration is invalid.
pub fn load_and_cluster(dir: &Path, config: &ClusterConfig) -> Result<Database, CatalogError> {
    Database::load_and_cluster(dir, config)
}

/// Rank every reference in `database` against `query`
///
/// Residues are compared case-insensitively.
///
/// # Errors
///
/// Returns `SearchError` for an empty database, an empty query, no match at the
/// configured threshold, or when every comparison fails.
pub fn search(
    query: &[u8],
    database: &Database,
    config: &SearchConfig,
) -> Result<Ranking, SearchError> {
    let query = query.to_ascii_uppercase();
    let cancel = config.cancel_token();
    SearchEngine::for_database(database, config.clone()).rank(&query, &cancel)
}
