use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Args;

use crate::catalog::store::Database;
use crate::cli::{DatabaseArgs, OutputFormat, RankingArgs};
use crate::core::family::FamilyAssignment;
use crate::core::sequence::Sequence;
use crate::matching::engine::{Ranking, SearchEngine};
use crate::parsing::fasta::parse_query;
use crate::report::SearchReport;

#[derive(Args)]
pub struct SearchArgs {
    /// Query file holding FASTA or bare residues; use '-' to read it from stdin
    #[arg(required = true)]
    pub query: PathBuf,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub ranking: RankingArgs,

    /// Number of matches to show (all by default)
    #[arg(short = 'n', long)]
    pub max_matches: Option<usize>,

    /// Write a text report of the search to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Execute search subcommand
///
/// # Errors
///
/// Returns an error if the query or database cannot be read, or the search
/// fails for a reason other than an empty database or no match.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SearchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let query = read_query(&args.query)?;

    if verbose {
        eprintln!("Query '{}': {} bases", query.name(), query.len());
    }

    let database = Database::load_and_cluster(&args.database.db, &args.database.cluster_config())?;

    if verbose {
        eprintln!(
            "Loaded {} references in {} families from {}",
            database.collection.len(),
            database.families.len(),
            args.database.db.display()
        );
    }

    let config = args.ranking.search_config(&args.database.alignment);
    let cancel = config.cancel_token();
    let engine = SearchEngine::for_database(&database, config);

    let ranking = match engine.rank(query.bases(), &cancel) {
        Ok(ranking) => ranking,
        Err(e) if e.is_reported_condition() => {
            eprintln!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.report {
        let report = SearchReport::new(query.name(), &ranking, &database.families);
        std::fs::write(path, report.render_text())?;
        if verbose {
            eprintln!("Report saved as {}", path.display());
        }
    }

    let shown = args.max_matches.unwrap_or(ranking.matches.len());

    match format {
        OutputFormat::Text => print_text_results(&query, &ranking, &database.families, shown),
        OutputFormat::Json => print_json_results(&query, &ranking, &database.families, shown)?,
        OutputFormat::Tsv => print_tsv_results(&ranking, &database.families, shown),
    }

    Ok(())
}

fn read_query(path: &Path) -> anyhow::Result<Sequence> {
    let text = if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };

    Ok(parse_query(&text)?)
}

fn family_label(families: &FamilyAssignment, name: &str) -> String {
    families
        .family_of(name)
        .map_or_else(|| "-".to_string(), ToString::to_string)
}

fn print_text_results(
    query: &Sequence,
    ranking: &Ranking,
    families: &FamilyAssignment,
    shown: usize,
) {
    println!("Query: {} ({} bp)", query.name(), query.len());
    println!(
        "Compared against {} references, {} at or above the threshold",
        ranking.compared,
        ranking.matches.len()
    );

    for (i, m) in ranking.matches.iter().take(shown).enumerate() {
        println!("\n{}", "─".repeat(60));
        println!("\n#{} {}", i + 1, m.name);
        println!("   Score: {:.2}", m.score);
        println!("   Family: {}", family_label(families, &m.name));

        if i == 0 {
            println!("\n   Alignment (partial):");
            println!("   Query:     {}", m.aligned_query);
            println!("   Reference: {}", m.aligned_reference);
        }
    }

    if !ranking.faults.is_empty() {
        println!("\n   Warning: {} comparisons failed:", ranking.faults.len());
        for fault in &ranking.faults {
            println!("   - {}: {:?}", fault.name, fault.kind);
        }
    }

    println!(
        "\nClosest family: {}",
        ranking
            .best_family
            .as_ref()
            .map_or_else(|| "Unknown".to_string(), ToString::to_string)
    );
}

fn print_json_results(
    query: &Sequence,
    ranking: &Ranking,
    families: &FamilyAssignment,
    shown: usize,
) -> anyhow::Result<()> {
    let matches: Vec<serde_json::Value> = ranking
        .matches
        .iter()
        .take(shown)
        .map(|m| {
            serde_json::json!({
                "name": m.name,
                "score": m.score,
                "family": families.family_of(&m.name),
                "aligned_query": m.aligned_query,
                "aligned_reference": m.aligned_reference,
            })
        })
        .collect();

    let output = serde_json::json!({
        "query": query,
        "compared": ranking.compared,
        "matches": matches,
        "best_family": ranking.best_family,
        "faults": ranking.faults,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_results(ranking: &Ranking, families: &FamilyAssignment, shown: usize) {
    println!("rank\tname\tscore\tfamily");
    for (i, m) in ranking.matches.iter().take(shown).enumerate() {
        println!(
            "{}\t{}\t{:.2}\t{}",
            i + 1,
            m.name,
            m.score,
            family_label(families, &m.name)
        );
    }
}
