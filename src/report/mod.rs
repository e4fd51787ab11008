//! Search reports.
//!
//! A [`SearchReport`] gathers what a reader needs from one search: the closest
//! reference and its score, a partial view of the alignment, the family
//! listing, and the family of the closest reference. It renders as plain text
//! and serializes to JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::core::family::FamilyAssignment;
use crate::core::types::FamilyId;
use crate::matching::engine::{Match, Ranking};

pub const REPORT_TITLE: &str = "Virus Family Detection Report";

#[derive(Debug, Clone, Serialize)]
pub struct FamilyListing {
    pub family: FamilyId,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub generated_at: DateTime<Utc>,
    pub query_name: String,
    /// Top-ranked reference, absent when nothing matched
    pub best_match: Option<Match>,
    pub best_family: Option<FamilyId>,
    pub families: Vec<FamilyListing>,
    /// Number of references that reached the threshold
    pub matched: usize,
    pub compared: usize,
    pub faults: usize,
}

impl SearchReport {
    pub fn new(query_name: &str, ranking: &Ranking, families: &FamilyAssignment) -> Self {
        Self {
            generated_at: Utc::now(),
            query_name: query_name.to_string(),
            best_match: ranking.best().cloned(),
            best_family: ranking.best_family.clone(),
            families: families
                .iter()
                .map(|(family, members)| FamilyListing {
                    family: family.clone(),
                    members: members.to_vec(),
                })
                .collect(),
            matched: ranking.matches.len(),
            compared: ranking.compared,
            faults: ranking.faults.len(),
        }
    }

    /// Human-readable report document
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "{REPORT_TITLE}")?;
        writeln!(out, "{}", "=".repeat(REPORT_TITLE.len()))?;
        writeln!(out)?;
        writeln!(
            out,
            "Generated on: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out, "Query: {}", self.query_name)?;
        writeln!(
            out,
            "References compared: {} ({} matched, {} failed)",
            self.compared, self.matched, self.faults
        )?;
        writeln!(out)?;

        writeln!(out, "Closest Match:")?;
        match &self.best_match {
            Some(best) => {
                writeln!(out, "  Closest Virus: {}", best.name)?;
                writeln!(out, "  Score: {:.2}", best.score)?;
                writeln!(out)?;

                if !best.aligned_query.is_empty() && !best.aligned_reference.is_empty() {
                    writeln!(out, "Alignment (Partial):")?;
                    writeln!(out, "  Target: {}", best.aligned_query)?;
                    writeln!(out, "  Match:  {}", best.aligned_reference)?;
                    writeln!(out)?;
                }
            }
            None => {
                writeln!(out, "  No reference reached the threshold")?;
                writeln!(out)?;
            }
        }

        writeln!(out, "Virus Families:")?;
        for listing in &self.families {
            writeln!(out, "  {}: {}", listing.family, listing.members.join(", "))?;
        }
        writeln!(out)?;

        writeln!(out, "Closest Family:")?;
        writeln!(
            out,
            "  Family Name: {}",
            self.best_family.as_ref().map_or("Unknown", FamilyId::as_str)
        )
    }
}
