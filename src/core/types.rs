use serde::{Deserialize, Serialize};

/// Unique identifier for a family of related reference sequences
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub String);

impl FamilyId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Family identifiers are handed out in founding order: `Family_1`, `Family_2`, ...
    #[must_use]
    pub fn numbered(ordinal: usize) -> Self {
        Self(format!("Family_{ordinal}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Round a score to two decimal places for reporting
#[must_use]
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
