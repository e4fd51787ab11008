//! Divide-and-conquer comparison of long sequences.
//!
//! Both sequences are halved at their own midpoints until either side is no
//! longer than the floor, each leaf pair is aligned, and the leaf results are
//! summed and concatenated left to right. The cost of a single alignment call
//! is bounded by the floor; the combined result is an approximation and not an
//! optimal global alignment.

use crate::matching::aligner::{AlignmentResult, PairwiseAligner};
use crate::matching::cancel::{CancelToken, Interrupted};

/// Default leaf size, in residues
pub const DEFAULT_MIN_LENGTH: usize = 1800;

pub struct RecursiveMatcher<'a> {
    aligner: &'a dyn PairwiseAligner,
    min_length: usize,
}

impl<'a> RecursiveMatcher<'a> {
    /// A floor of zero is treated as one so every level shrinks both inputs
    pub fn new(aligner: &'a dyn PairwiseAligner, min_length: usize) -> Self {
        Self {
            aligner,
            min_length: min_length.max(1),
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Compare `a` against `b`.
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` if `cancel` fires before the last leaf is aligned.
    /// The token is checked once per recursion level.
    pub fn match_pair(
        &self,
        a: &[u8],
        b: &[u8],
        cancel: &CancelToken,
    ) -> Result<AlignmentResult, Interrupted> {
        cancel.check()?;

        if a.len() <= self.min_length || b.len() <= self.min_length {
            return Ok(self.aligner.align(a, b));
        }

        let (left_a, right_a) = a.split_at(a.len() / 2);
        let (left_b, right_b) = b.split_at(b.len() / 2);

        let left = self.match_pair(left_a, left_b, cancel)?;
        let right = self.match_pair(right_a, right_b, cancel)?;

        Ok(left.concat(right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::aligner::{LocalAligner, ScoringParams};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the length of every leaf it is asked to align
    #[derive(Default)]
    struct CountingAligner {
        calls: AtomicUsize,
    }

    impl PairwiseAligner for CountingAligner {
        fn align(&self, a: &[u8], b: &[u8]) -> AlignmentResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            #[allow(clippy::cast_precision_loss)]
            let score = (a.len() + b.len()) as f64;
            AlignmentResult::new(
                score,
                String::from_utf8_lossy(a),
                String::from_utf8_lossy(b),
            )
        }
    }

    fn bases(n: usize) -> Vec<u8> {
        b"ACGGTCAT".iter().copied().cycle().take(n).collect()
    }

    #[test]
    fn test_base_case_matches_direct_alignment() {
        let aligner = LocalAligner::default();
        let a = bases(300);
        let mut b = bases(280);
        b[17] = b'T';

        let matcher = RecursiveMatcher::new(&aligner, 300);
        let recursive = matcher.match_pair(&a, &b, &CancelToken::new()).unwrap();
        assert_eq!(recursive, aligner.align(&a, &b));
    }

    #[test]
    fn test_either_side_at_floor_is_a_leaf() {
        let aligner = CountingAligner::default();
        let matcher = RecursiveMatcher::new(&aligner, 10);
        let result = matcher
            .match_pair(&bases(10), &bases(1000), &CancelToken::new())
            .unwrap();
        assert_eq!(aligner.calls.load(Ordering::SeqCst), 1);
        assert!((result.score - 1010.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_split_and_recombine_in_order() {
        let aligner = CountingAligner::default();
        let matcher = RecursiveMatcher::new(&aligner, 2);
        let a = b"AACCGGTT";
        let b = b"ACGTAC";

        let result = matcher.match_pair(a, b, &CancelToken::new()).unwrap();

        // Fragments concatenate back to the inputs
        assert_eq!(result.aligned_a, "AACCGGTT");
        assert_eq!(result.aligned_b, "ACGTAC");
        // Scores of all leaves sum to the total residue count
        assert!((result.score - 14.0).abs() < f64::EPSILON);
        // 8/6 -> (4/3, 4/3) -> each 4/3 splits into (2/1, 2/2): four leaves
        assert_eq!(aligner.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_uneven_lengths_terminate() {
        let aligner = LocalAligner::default();
        for (len_a, len_b, floor) in [(1, 5000, 1), (7, 3, 1), (4097, 129, 3), (500, 500, 0)] {
            let matcher = RecursiveMatcher::new(&aligner, floor);
            let result = matcher.match_pair(&bases(len_a), &bases(len_b), &CancelToken::new());
            assert!(result.is_ok(), "failed for {len_a}/{len_b}/{floor}");
        }
    }

    #[test]
    fn test_empty_inputs() {
        let aligner = LocalAligner::default();
        let matcher = RecursiveMatcher::new(&aligner, 5);
        let result = matcher.match_pair(b"", &bases(100), &CancelToken::new()).unwrap();
        assert_eq!(result, AlignmentResult::empty());
    }

    #[test]
    fn test_zero_floor_is_clamped() {
        let aligner = LocalAligner::default();
        assert_eq!(RecursiveMatcher::new(&aligner, 0).min_length(), 1);
    }

    #[test]
    fn test_identical_long_sequences_score_every_leaf() {
        let aligner = LocalAligner::new(ScoringParams {
            normalize: true,
            ..ScoringParams::default()
        });
        let seq = bases(4000);
        let matcher = RecursiveMatcher::new(&aligner, 1000);
        let result = matcher.match_pair(&seq, &seq, &CancelToken::new()).unwrap();
        // 4000 -> 2000 -> 1000: four leaves, each normalized to 2.0
        assert!((result.score - 8.0).abs() < 1e-9);
        assert_eq!(result.aligned_a.len(), 4000);
    }

    #[test]
    fn test_cancelled_token_stops_recursion() {
        let aligner = CountingAligner::default();
        let matcher = RecursiveMatcher::new(&aligner, 2);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = matcher.match_pair(&bases(64), &bases(64), &cancel);
        assert_eq!(result, Err(Interrupted::Cancelled));
        assert_eq!(aligner.calls.load(Ordering::SeqCst), 0);
    }
}
