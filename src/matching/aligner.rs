//! Pairwise local alignment behind a small trait.
//!
//! [`PairwiseAligner`] is the only alignment primitive the rest of the crate
//! uses. [`LocalAligner`] implements it with rust-bio's affine-gap
//! Smith-Waterman.

use bio::alignment::pairwise::Aligner;
use bio::alignment::{Alignment, AlignmentOperation};
use serde::{Deserialize, Serialize};

/// Symbol used for gaps in aligned fragments
pub const GAP: char = '-';

/// Score and aligned fragments of one comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentResult {
    pub score: f64,
    pub aligned_a: String,
    pub aligned_b: String,
}

impl AlignmentResult {
    pub fn new(score: f64, aligned_a: impl Into<String>, aligned_b: impl Into<String>) -> Self {
        Self {
            score,
            aligned_a: aligned_a.into(),
            aligned_b: aligned_b.into(),
        }
    }

    /// Zero score, no aligned residues
    pub fn empty() -> Self {
        Self::new(0.0, String::new(), String::new())
    }

    /// Sum the scores and append `other`'s fragments after ours
    #[must_use]
    pub fn concat(mut self, other: Self) -> Self {
        self.score += other.score;
        self.aligned_a.push_str(&other.aligned_a);
        self.aligned_b.push_str(&other.aligned_b);
        self
    }
}

/// An alignment primitive: two sequences in, score and aligned fragments out
pub trait PairwiseAligner: Send + Sync {
    fn align(&self, a: &[u8], b: &[u8]) -> AlignmentResult;
}

/// Scoring parameters for local alignment.
///
/// A gap of length `k` scores `open_gap_score + (k - 1) * extend_gap_score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub open_gap_score: i32,
    pub extend_gap_score: i32,
    /// Divide the raw score by the aligned region length. Off by default:
    /// normalized leaves top out at `match_score`, far below the default threshold.
    pub normalize: bool,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_score: -2,
            open_gap_score: -5,
            extend_gap_score: -1,
            normalize: false,
        }
    }
}

impl ScoringParams {
    /// # Errors
    ///
    /// Returns a description of the problem if a gap score is positive or the
    /// extension penalty is harsher than the opening penalty.
    pub fn validate(&self) -> Result<(), String> {
        if self.open_gap_score > 0 || self.extend_gap_score > 0 {
            return Err("gap scores must not be positive".to_string());
        }
        if self.extend_gap_score < self.open_gap_score {
            return Err(format!(
                "gap extension score ({}) must not be lower than gap open score ({})",
                self.extend_gap_score, self.open_gap_score
            ));
        }
        Ok(())
    }
}

/// Smith-Waterman local alignment with affine gaps
#[derive(Debug, Clone, Default)]
pub struct LocalAligner {
    params: ScoringParams,
}

impl LocalAligner {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }
}

impl PairwiseAligner for LocalAligner {
    fn align(&self, a: &[u8], b: &[u8]) -> AlignmentResult {
        if a.is_empty() || b.is_empty() {
            return AlignmentResult::empty();
        }

        let ScoringParams {
            match_score,
            mismatch_score,
            open_gap_score,
            extend_gap_score,
            normalize,
        } = self.params;

        // rust-bio charges gap_open + k * gap_extend for a gap of length k
        let gap_open = open_gap_score - extend_gap_score;
        let score_fn = move |x: u8, y: u8| if x == y { match_score } else { mismatch_score };

        let mut aligner = Aligner::with_capacity(a.len(), b.len(), gap_open, extend_gap_score, score_fn);
        let alignment = aligner.local(a, b);

        let (aligned_a, aligned_b) = render_fragments(&alignment, a, b);
        let raw = f64::from(alignment.score);

        let score = if normalize {
            let aligned_len = (alignment.xend - alignment.xstart).max(alignment.yend - alignment.ystart);
            if aligned_len > 0 {
                #[allow(clippy::cast_precision_loss)] // Sequence lengths fit easily in f64
                {
                    raw / aligned_len as f64
                }
            } else {
                0.0
            }
        } else {
            raw
        };

        AlignmentResult::new(score, aligned_a, aligned_b)
    }
}

/// Build the gapped fragments covered by a local alignment
fn render_fragments(alignment: &Alignment, a: &[u8], b: &[u8]) -> (String, String) {
    let capacity = alignment.operations.len();
    let mut out_a = String::with_capacity(capacity);
    let mut out_b = String::with_capacity(capacity);
    let mut x = alignment.xstart;
    let mut y = alignment.ystart;

    for op in &alignment.operations {
        match op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                out_a.push(char::from(a[x]));
                out_b.push(char::from(b[y]));
                x += 1;
                y += 1;
            }
            AlignmentOperation::Del => {
                out_a.push(GAP);
                out_b.push(char::from(b[y]));
                y += 1;
            }
            AlignmentOperation::Ins => {
                out_a.push(char::from(a[x]));
                out_b.push(GAP);
                x += 1;
            }
            // Local alignments leave the unaligned flanks out of the fragments
            AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
        }
    }

    (out_a, out_b)
}
