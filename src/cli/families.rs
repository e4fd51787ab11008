use clap::Args;

use crate::catalog::store::Database;
use crate::cli::{DatabaseArgs, OutputFormat};

#[derive(Args)]
pub struct FamiliesArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Execute families subcommand
///
/// # Errors
///
/// Returns an error if the database directory cannot be loaded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: FamiliesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let database = Database::load_and_cluster(&args.database.db, &args.database.cluster_config())?;

    if database.collection.is_empty() {
        eprintln!("No DNA sequences found in the database.");
        return Ok(());
    }

    if verbose {
        eprintln!(
            "Grouped {} references into {} families",
            database.collection.len(),
            database.families.len()
        );
    }

    match format {
        OutputFormat::Text => print_text(&database),
        OutputFormat::Json => print_json(&database)?,
        OutputFormat::Tsv => print_tsv(&database),
    }

    Ok(())
}

fn print_text(database: &Database) {
    for (family, members) in database.families.iter() {
        println!("{family} ({} members)", members.len());
        for name in members {
            match database.collection.get(name) {
                Some(seq) => println!("   {name}  {} bp  {}", seq.len(), seq.md5()),
                None => println!("   {name}"),
            }
        }
    }
}

fn print_json(database: &Database) -> anyhow::Result<()> {
    let output: Vec<serde_json::Value> = database
        .families
        .iter()
        .map(|(family, members)| {
            let members: Vec<_> = members
                .iter()
                .filter_map(|name| database.collection.get(name))
                .collect();
            serde_json::json!({
                "family": family,
                "members": members,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(database: &Database) {
    println!("family\tname\tlength\tmd5");
    for (family, members) in database.families.iter() {
        for name in members {
            if let Some(seq) = database.collection.get(name) {
                println!("{family}\t{name}\t{}\t{}", seq.len(), seq.md5());
            }
        }
    }
}
