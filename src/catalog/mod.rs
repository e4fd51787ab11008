//! Reference collection storage and family clustering.
//!
//! A [`Database`](store::Database) is one load of a directory of FASTA files:
//! the [`ReferenceCollection`](store::ReferenceCollection) in deterministic
//! order plus the [`FamilyAssignment`](crate::core::family::FamilyAssignment)
//! computed for it. Clustering runs once per load and is reused by every search.
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_kin::catalog::cluster::ClusterConfig;
//! use seq_kin::catalog::store::Database;
//! use std::path::Path;
//!
//! let database = Database::load_and_cluster(Path::new("viruses"), &ClusterConfig::default()).unwrap();
//!
//! for (family, members) in database.families.iter() {
//!     println!("{family}: {}", members.join(", "));
//! }
//! ```

pub mod cluster;
pub mod store;
