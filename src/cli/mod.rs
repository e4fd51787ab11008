//! Command-line interface for seq-kin.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **search**: Rank the references in a database against a query sequence
//! - **families**: Show how the references in a database group into families
//! - **compare**: Compare two sequences directly
//! - **serve**: Start the interactive web interface
//!
//! ## Usage
//!
//! ```text
//! # Find the closest relatives of a sample
//! seq-kin search sample.fasta --db viruses/
//!
//! # Pipe a sequence in and write a report
//! cat sample.fasta | seq-kin search - --db viruses/ --report report.txt
//!
//! # JSON output for scripting
//! seq-kin search sample.fasta --db viruses/ --format json
//!
//! # Start web UI
//! seq-kin serve --db viruses/ --port 8080 --open
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::cluster::ClusterConfig;
use crate::matching::aligner::ScoringParams;
use crate::matching::engine::{SearchConfig, DEFAULT_PREVIEW_LENGTH, DEFAULT_THRESHOLD, DEFAULT_WORKERS};
use crate::matching::recursive::DEFAULT_MIN_LENGTH;

pub mod compare;
pub mod families;
pub mod search;

#[derive(Parser)]
#[command(name = "seq-kin")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Find the closest relatives of a DNA sequence and group references into families")]
#[command(
    long_about = "seq-kin compares a DNA sequence against a directory of reference FASTA files.\n\nIt aligns the query against every reference in parallel and reports:\n- The references scoring at or above a threshold, best first\n- A preview of the alignment with the closest reference\n- The family of the closest reference, from clustering the references by similarity"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank the references in a database against a query sequence
    Search(search::SearchArgs),

    /// Show the families the references in a database group into
    Families(families::FamiliesArgs),

    /// Compare two sequences
    Compare(compare::CompareArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub ranking: RankingArgs,
}

/// Where the references live and how they are grouped
#[derive(clap::Args, Clone, Debug)]
pub struct DatabaseArgs {
    /// Directory of reference FASTA files
    #[arg(long = "db", value_name = "DIR")]
    pub db: PathBuf,

    /// Minimum score against a family founder to join that family
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub family_threshold: f64,

    #[command(flatten)]
    pub alignment: AlignmentArgs,
}

impl DatabaseArgs {
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            threshold: self.family_threshold,
            min_length: self.alignment.min_length,
            scoring: self.alignment.scoring(),
        }
    }
}

/// Alignment scoring options
#[derive(clap::Args, Clone, Debug)]
pub struct AlignmentArgs {
    /// Sequences longer than this are split in half and compared piecewise
    #[arg(long, default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,

    /// Score for a matching base
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    pub match_score: i32,

    /// Score for a mismatching base
    #[arg(long, default_value_t = -2, allow_negative_numbers = true)]
    pub mismatch_score: i32,

    /// Score for opening a gap
    #[arg(long, default_value_t = -5, allow_negative_numbers = true)]
    pub open_gap_score: i32,

    /// Score for each further base of a gap
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub extend_gap_score: i32,

    /// Score each aligned region per aligned base instead of summing raw scores
    #[arg(long)]
    pub normalize: bool,
}

impl AlignmentArgs {
    pub fn scoring(&self) -> ScoringParams {
        ScoringParams {
            match_score: self.match_score,
            mismatch_score: self.mismatch_score,
            open_gap_score: self.open_gap_score,
            extend_gap_score: self.extend_gap_score,
            normalize: self.normalize,
        }
    }
}

/// Search options
#[derive(clap::Args, Clone, Debug)]
pub struct RankingArgs {
    /// Minimum score for a reference to be reported
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Number of alignment workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Drop a reference whose comparison takes longer than this (milliseconds)
    #[arg(long)]
    pub task_timeout_ms: Option<u64>,

    /// Stop the whole search after this long (milliseconds)
    #[arg(long)]
    pub search_timeout_ms: Option<u64>,
}

impl RankingArgs {
    pub fn search_config(&self, alignment: &AlignmentArgs) -> SearchConfig {
        SearchConfig {
            threshold: self.threshold,
            min_length: alignment.min_length,
            workers: self.workers,
            task_timeout_ms: self.task_timeout_ms,
            search_timeout_ms: self.search_timeout_ms,
            preview_length: DEFAULT_PREVIEW_LENGTH,
            scoring: alignment.scoring(),
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
