//! Grouping of reference sequences into families.
//!
//! Families are formed by walking the collection in order. Each unassigned
//! sequence founds a new family, and every later unassigned sequence that
//! scores at least the threshold against that founder joins it.
//!
//! Members are compared against the founder only, never against each other,
//! so membership is not transitive: if A matches B and B matches C but A does
//! not match C, C founds its own family. This keeps clustering at one
//! comparison per (founder, candidate) pair.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::store::ReferenceCollection;
use crate::core::family::FamilyAssignment;
use crate::core::sequence::Sequence;
use crate::core::types::FamilyId;
use crate::matching::aligner::{PairwiseAligner, ScoringParams};
use crate::matching::cancel::{CancelToken, Interrupted};
use crate::matching::engine::DEFAULT_THRESHOLD;
use crate::matching::recursive::{RecursiveMatcher, DEFAULT_MIN_LENGTH};

/// Configuration for family clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Minimum score against a founder to join its family
    pub threshold: f64,
    /// Leaf size for the divide-and-conquer comparison
    pub min_length: usize,
    pub scoring: ScoringParams,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
            scoring: ScoringParams::default(),
        }
    }
}

impl ClusterConfig {
    /// # Errors
    ///
    /// Returns a description of the problem for a non-finite threshold or
    /// invalid scoring parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() {
            return Err("threshold must be a finite number".to_string());
        }
        self.scoring.validate()
    }
}

pub struct FamilyClusterer<'a> {
    matcher: RecursiveMatcher<'a>,
    threshold: f64,
}

impl<'a> FamilyClusterer<'a> {
    pub fn new(aligner: &'a dyn PairwiseAligner, config: &ClusterConfig) -> Self {
        Self {
            matcher: RecursiveMatcher::new(aligner, config.min_length),
            threshold: config.threshold,
        }
    }

    /// Partition `collection` into numbered families (`Family_1`, `Family_2`, ...)
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if `cancel` fires or its deadline passes.
    pub fn cluster(
        &self,
        collection: &ReferenceCollection,
        cancel: &CancelToken,
    ) -> Result<FamilyAssignment, Interrupted> {
        let sequences: Vec<&Sequence> = collection.iter().collect();
        let mut assigned = vec![false; sequences.len()];
        let mut families = FamilyAssignment::new();
        let mut comparisons = 0usize;

        for (i, founder) in sequences.iter().enumerate() {
            if assigned[i] {
                continue;
            }
            cancel.check()?;

            let id = FamilyId::numbered(families.len() + 1);
            families.found(id.clone(), founder.name());
            assigned[i] = true;

            for (j, candidate) in sequences.iter().enumerate().skip(i + 1) {
                if assigned[j] {
                    continue;
                }
                let result = self
                    .matcher
                    .match_pair(founder.bases(), candidate.bases(), cancel)?;
                comparisons += 1;

                if result.score >= self.threshold {
                    debug!(
                        "{} joins {id} (score {:.2} against {})",
                        candidate.name(),
                        result.score,
                        founder.name()
                    );
                    families.join(&id, candidate.name());
                    assigned[j] = true;
                }
            }
        }

        info!(
            "Grouped {} sequences into {} families ({comparisons} comparisons)",
            sequences.len(),
            families.len()
        );
        Ok(families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::aligner::{AlignmentResult, LocalAligner};
    use std::collections::HashMap;

    /// Scores pairs from a fixed table keyed by the first base of each sequence
    struct TableAligner {
        scores: HashMap<(u8, u8), f64>,
    }

    impl TableAligner {
        fn new(pairs: &[(u8, u8, f64)]) -> Self {
            let mut scores = HashMap::new();
            for &(a, b, s) in pairs {
                scores.insert((a, b), s);
                scores.insert((b, a), s);
            }
            Self { scores }
        }
    }

    impl PairwiseAligner for TableAligner {
        fn align(&self, a: &[u8], b: &[u8]) -> AlignmentResult {
            let score = self.scores.get(&(a[0], b[0])).copied().unwrap_or(0.0);
            AlignmentResult::new(score, "", "")
        }
    }

    fn seq(name: &str, base: char) -> Sequence {
        Sequence::new(name, base.to_string().repeat(120))
    }

    #[test]
    fn test_empty_collection() {
        let aligner = TableAligner::new(&[]);
        let families = FamilyClusterer::new(&aligner, &ClusterConfig::default())
            .cluster(&ReferenceCollection::new(), &CancelToken::new())
            .unwrap();
        assert!(families.is_empty());
    }

    #[test]
    fn test_members_compared_to_founder_only() {
        // A~B and B~C, but A and C are unrelated
        let aligner = TableAligner::new(&[(b'A', b'C', 50.0), (b'C', b'G', 50.0)]);
        let collection = ReferenceCollection::from_sequences(vec![
            seq("a", 'A'),
            seq("b", 'C'),
            seq("c", 'G'),
        ]);

        let families = FamilyClusterer::new(&aligner, &ClusterConfig::default())
            .cluster(&collection, &CancelToken::new())
            .unwrap();

        assert_eq!(families.len(), 2);
        assert_eq!(
            families.members(&FamilyId::numbered(1)).unwrap(),
            &["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            families.members(&FamilyId::numbered(2)).unwrap(),
            &["c".to_string()]
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let aligner = TableAligner::new(&[(b'A', b'C', DEFAULT_THRESHOLD)]);
        let collection = ReferenceCollection::from_sequences(vec![seq("a", 'A'), seq("b", 'C')]);
        let families = FamilyClusterer::new(&aligner, &ClusterConfig::default())
            .cluster(&collection, &CancelToken::new())
            .unwrap();
        assert_eq!(families.len(), 1);
    }

    #[test]
    fn test_partition_and_determinism() {
        let aligner = LocalAligner::default();
        let unit = ["ACGTTGCA", "TTTTAAAA", "GCGCGCGC", "ACGTTGCA", "CATCATGG"];
        let collection = ReferenceCollection::from_sequences(
            unit.iter()
                .enumerate()
                .map(|(i, u)| Sequence::new(format!("ref{i}"), u.repeat(20))),
        );

        let clusterer = FamilyClusterer::new(&aligner, &ClusterConfig::default());
        let first = clusterer.cluster(&collection, &CancelToken::new()).unwrap();
        let second = clusterer.cluster(&collection, &CancelToken::new()).unwrap();

        assert!(first.is_partition_of(collection.names()));
        let a: Vec<_> = first.iter().map(|(id, m)| (id.clone(), m.to_vec())).collect();
        let b: Vec<_> = second.iter().map(|(id, m)| (id.clone(), m.to_vec())).collect();
        assert_eq!(a, b);
        assert_eq!(first.family_of("ref0"), first.family_of("ref3"));
    }

    #[test]
    fn test_cancelled_clustering() {
        let aligner = TableAligner::new(&[]);
        let collection = ReferenceCollection::from_sequences(vec![seq("a", 'A'), seq("b", 'C')]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = FamilyClusterer::new(&aligner, &ClusterConfig::default())
            .cluster(&collection, &cancel);
        assert_eq!(result.unwrap_err(), Interrupted::Cancelled);
    }
}
