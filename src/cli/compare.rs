use std::path::{Path, PathBuf};

use clap::Args;

use crate::cli::{AlignmentArgs, OutputFormat};
use crate::core::sequence::Sequence;
use crate::matching::aligner::{AlignmentResult, LocalAligner};
use crate::matching::cancel::CancelToken;
use crate::matching::engine::{preview, DEFAULT_PREVIEW_LENGTH};
use crate::matching::recursive::RecursiveMatcher;
use crate::parsing::fasta::{parse_fasta_file, validate_residues};

#[derive(Args)]
pub struct CompareArgs {
    /// First FASTA file (its first sequence is used)
    #[arg(required = true)]
    pub input_a: PathBuf,

    /// Second FASTA file (its first sequence is used)
    #[arg(required = true)]
    pub input_b: PathBuf,

    #[command(flatten)]
    pub alignment: AlignmentArgs,

    /// Characters of each aligned sequence to show
    #[arg(long, default_value_t = DEFAULT_PREVIEW_LENGTH)]
    pub preview_length: usize,
}

/// Execute compare subcommand
///
/// # Errors
///
/// Returns an error if either input cannot be parsed or the scoring options are invalid.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CompareArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let seq_a = first_sequence(&args.input_a)?;
    let seq_b = first_sequence(&args.input_b)?;

    if verbose {
        eprintln!("Input A: '{}' ({} bp)", seq_a.name(), seq_a.len());
        eprintln!("Input B: '{}' ({} bp)", seq_b.name(), seq_b.len());
    }

    let scoring = args.alignment.scoring();
    scoring.validate().map_err(|e| anyhow::anyhow!(e))?;

    let aligner = LocalAligner::new(scoring);
    let matcher = RecursiveMatcher::new(&aligner, args.alignment.min_length);
    let result = matcher.match_pair(seq_a.bases(), seq_b.bases(), &CancelToken::new())?;

    match format {
        OutputFormat::Text => print_text_comparison(&args, &seq_a, &seq_b, &result),
        OutputFormat::Json => print_json_comparison(&args, &seq_a, &seq_b, &result)?,
        OutputFormat::Tsv => print_tsv_comparison(&seq_a, &seq_b, &result),
    }

    Ok(())
}

fn first_sequence(path: &Path) -> anyhow::Result<Sequence> {
    let sequence = parse_fasta_file(path)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No sequences found in {}", path.display()))?;
    validate_residues(&sequence)?;
    Ok(sequence)
}

fn print_text_comparison(
    args: &CompareArgs,
    seq_a: &Sequence,
    seq_b: &Sequence,
    result: &AlignmentResult,
) {
    println!("Comparison Results");
    println!("{}", "=".repeat(60));

    println!("\nInput A: {}", args.input_a.display());
    println!("  Sequence: {}", seq_a.name());
    println!("  Length: {} bp", seq_a.len());
    println!("  MD5: {}", seq_a.md5());

    println!("\nInput B: {}", args.input_b.display());
    println!("  Sequence: {}", seq_b.name());
    println!("  Length: {} bp", seq_b.len());
    println!("  MD5: {}", seq_b.md5());

    println!("\nSimilarity:");
    println!("  Score: {:.2}", result.score);
    println!("  Identical: {}", seq_a.md5() == seq_b.md5());

    println!("\nAlignment (partial):");
    println!("  A: {}", preview(&result.aligned_a, args.preview_length));
    println!("  B: {}", preview(&result.aligned_b, args.preview_length));
}

fn print_json_comparison(
    args: &CompareArgs,
    seq_a: &Sequence,
    seq_b: &Sequence,
    result: &AlignmentResult,
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "input_a": {
            "path": args.input_a.display().to_string(),
            "sequence": seq_a,
        },
        "input_b": {
            "path": args.input_b.display().to_string(),
            "sequence": seq_b,
        },
        "score": result.score,
        "identical": seq_a.md5() == seq_b.md5(),
        "aligned_a": preview(&result.aligned_a, args.preview_length),
        "aligned_b": preview(&result.aligned_b, args.preview_length),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_comparison(seq_a: &Sequence, seq_b: &Sequence, result: &AlignmentResult) {
    println!("name_a\tlength_a\tname_b\tlength_b\tscore\tidentical");
    println!(
        "{}\t{}\t{}\t{}\t{:.4}\t{}",
        seq_a.name(),
        seq_a.len(),
        seq_b.name(),
        seq_b.len(),
        result.score,
        seq_a.md5() == seq_b.md5(),
    );
}
