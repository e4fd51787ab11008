use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::cluster::{ClusterConfig, FamilyClusterer};
use crate::core::family::FamilyAssignment;
use crate::core::sequence::Sequence;
use crate::matching::aligner::{LocalAligner, PairwiseAligner};
use crate::matching::cancel::{CancelToken, Interrupted};
use crate::parsing::fasta::{is_fasta_file, parse_fasta_file, validate_residues, ParseError};

/// Sequences shorter than this are not kept as references
pub const MIN_SEQUENCE_LENGTH: usize = 100;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Clustering stopped early: {0}")]
    Interrupted(#[from] Interrupted),

    #[error("Invalid clustering configuration: {0}")]
    InvalidConfig(String),
}

/// Reference sequences keyed by name, in load order
#[derive(Debug, Clone, Default)]
pub struct ReferenceCollection {
    sequences: IndexMap<String, Sequence>,
}

impl ReferenceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, dropping sequences below [`MIN_SEQUENCE_LENGTH`]
    pub fn from_sequences(sequences: impl IntoIterator<Item = Sequence>) -> Self {
        let mut collection = Self::new();
        for sequence in sequences {
            collection.insert(sequence);
        }
        collection
    }

    /// Load every FASTA file in `dir`.
    ///
    /// Files are read in sorted file-name order so the collection order (and
    /// therefore family numbering) is stable across runs. Files without any
    /// records and records with non-nucleotide residues are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotADirectory` if `dir` is not a directory,
    /// `CatalogError::Io` if it cannot be listed, or `CatalogError::File` if a
    /// FASTA file cannot be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::NotADirectory(dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_fasta_file(&path) {
                paths.push(path);
            } else {
                debug!("Skipping non-FASTA entry {}", path.display());
            }
        }
        paths.sort();

        let mut collection = Self::new();
        for path in &paths {
            let sequences = match parse_fasta_file(path) {
                Ok(sequences) => sequences,
                Err(ParseError::InvalidFormat(reason)) => {
                    warn!("Skipping {}: {reason}", path.display());
                    continue;
                }
                Err(source) => {
                    return Err(CatalogError::File {
                        path: path.clone(),
                        source,
                    })
                }
            };

            for sequence in sequences {
                if let Err(e) = validate_residues(&sequence) {
                    warn!("Skipping sequence in {}: {e}", path.display());
                    continue;
                }
                collection.insert(sequence);
            }
        }

        info!(
            "Loaded {} reference sequences from {} files in {}",
            collection.len(),
            paths.len(),
            dir.display()
        );
        Ok(collection)
    }

    /// Add a sequence. Returns false if it was too short to keep.
    ///
    /// A sequence whose name is already present replaces the earlier one in place.
    pub fn insert(&mut self, sequence: Sequence) -> bool {
        if sequence.len() < MIN_SEQUENCE_LENGTH {
            debug!(
                "Skipping '{}': {} bases is below the minimum of {MIN_SEQUENCE_LENGTH}",
                sequence.name(),
                sequence.len()
            );
            return false;
        }

        let name = sequence.name().to_string();
        if self.sequences.insert(name.clone(), sequence).is_some() {
            warn!("Duplicate sequence name '{name}'; keeping the last definition");
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    /// Sequences in collection order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// One load of the reference collection together with its family assignment
#[derive(Debug, Clone)]
pub struct Database {
    pub collection: ReferenceCollection,
    pub families: FamilyAssignment,
    pub loaded_at: DateTime<Utc>,
    /// Directory the collection was read from, if any
    pub source: Option<PathBuf>,
}

impl Database {
    /// Load a directory of FASTA files and cluster it into families
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be loaded or the configuration is invalid.
    pub fn load_and_cluster(dir: &Path, config: &ClusterConfig) -> Result<Self, CatalogError> {
        let collection = ReferenceCollection::load_from_dir(dir)?;
        let mut database = Self::from_collection(collection, config)?;
        database.source = Some(dir.to_path_buf());
        Ok(database)
    }

    /// Cluster an already loaded collection with the default local aligner
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidConfig` if the configuration is invalid.
    pub fn from_collection(
        collection: ReferenceCollection,
        config: &ClusterConfig,
    ) -> Result<Self, CatalogError> {
        config.validate().map_err(CatalogError::InvalidConfig)?;
        let aligner = LocalAligner::new(config.scoring);
        Self::cluster_with(collection, config, &aligner, &CancelToken::new())
    }

    /// Cluster a collection with a caller supplied aligner
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Interrupted` if `cancel` fires during clustering.
    pub fn cluster_with(
        collection: ReferenceCollection,
        config: &ClusterConfig,
        aligner: &dyn PairwiseAligner,
        cancel: &CancelToken,
    ) -> Result<Self, CatalogError> {
        let families = FamilyClusterer::new(aligner, config).cluster(&collection, cancel)?;

        Ok(Self {
            collection,
            families,
            loaded_at: Utc::now(),
            source: None,
        })
    }

    /// An empty database with no source directory
    pub fn empty() -> Self {
        Self {
            collection: ReferenceCollection::new(),
            families: FamilyAssignment::new(),
            loaded_at: Utc::now(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn bases(unit: &str, len: usize) -> String {
        unit.repeat(len / unit.len() + 1)[..len].to_string()
    }

    fn write_fasta(dir: &Path, file: &str, records: &[(&str, String)]) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        for (name, seq) in records {
            writeln!(f, ">{name}\n{seq}").unwrap();
        }
    }

    #[test]
    fn test_short_sequences_are_dropped() {
        let collection = ReferenceCollection::from_sequences(vec![
            Sequence::new("short", bases("ACGT", 99)),
            Sequence::new("exact", bases("ACGT", 100)),
        ]);
        assert_eq!(collection.len(), 1);
        assert!(collection.get("short").is_none());
        assert!(collection.get("exact").is_some());
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let collection = ReferenceCollection::from_sequences(vec![
            Sequence::new("a", bases("A", 120)),
            Sequence::new("b", bases("C", 120)),
            Sequence::new("a", bases("G", 130)),
        ]);
        let names: Vec<&str> = collection.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(collection.get("a").unwrap().len(), 130);
    }

    #[test]
    fn test_load_from_dir_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write_fasta(dir.path(), "b.fasta", &[("beta", bases("ACGT", 150))]);
        write_fasta(
            dir.path(),
            "a.fa",
            &[("alpha", bases("TTGA", 150)), ("tiny", bases("A", 10))],
        );
        write_fasta(dir.path(), "c.fna", &[("prot", bases("MKV", 150))]);
        std::fs::write(dir.path().join("notes.txt"), "not a fasta").unwrap();

        let collection = ReferenceCollection::load_from_dir(dir.path()).unwrap();
        let names: Vec<&str> = collection.names().collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_load_from_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            ReferenceCollection::load_from_dir(&missing),
            Err(CatalogError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_load_skips_empty_file() {
        let dir = TempDir::new().unwrap();
        write_fasta(dir.path(), "a.fasta", &[("kept", bases("ACGT", 150))]);
        std::fs::write(dir.path().join("empty.fasta"), "").unwrap();

        let collection = ReferenceCollection::load_from_dir(dir.path()).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["kept"]);
    }

    #[test]
    fn test_database_partitions_collection() {
        let dir = TempDir::new().unwrap();
        let seq = bases("ACGTTGCA", 200);
        write_fasta(
            dir.path(),
            "refs.fa",
            &[("one", seq.clone()), ("two", seq), ("three", bases("GGCA", 200))],
        );

        let database = Database::load_and_cluster(dir.path(), &ClusterConfig::default()).unwrap();

        assert_eq!(database.collection.len(), 3);
        assert!(database
            .families
            .is_partition_of(database.collection.names()));
        assert_eq!(
            database.families.family_of("one"),
            database.families.family_of("two")
        );
        assert_eq!(database.source.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClusterConfig {
            min_length: 0,
            threshold: f64::NAN,
            ..ClusterConfig::default()
        };
        assert!(matches!(
            Database::from_collection(ReferenceCollection::new(), &config),
            Err(CatalogError::InvalidConfig(_))
        ));
    }
}
