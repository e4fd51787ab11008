//! Parser for FASTA files using noodles.
//!
//! Reads named nucleotide sequences from files or in-memory text.
//! Supports both uncompressed and gzip/bgzip compressed files.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use thiserror::Error;

use crate::core::sequence::Sequence;
use crate::utils::validation::{check_sequence_limit, find_invalid_residue, MAX_SEQUENCES};

/// Name given to a query supplied as bare residues without a FASTA header
pub const RAW_QUERY_NAME: &str = "query";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FASTA: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Too many sequences: {0} exceeds maximum allowed ({MAX_SEQUENCES})")]
    TooManySequences(usize),

    #[error("Sequence '{name}' contains invalid symbol '{symbol}' at position {position}")]
    InvalidSequence {
        name: String,
        position: usize,
        symbol: char,
    },
}

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();

    // Check for gzipped FASTA
    if path_str.ends_with(".fa.gz")
        || path_str.ends_with(".fasta.gz")
        || path_str.ends_with(".fna.gz")
        || path_str.ends_with(".fa.bgz")
        || path_str.ends_with(".fasta.bgz")
        || path_str.ends_with(".fna.bgz")
    {
        return true;
    }

    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Parse every sequence in a FASTA file.
///
/// Residues are uppercased; names are the record name without its description.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, `ParseError::InvalidFormat` if no sequences are found, or
/// `ParseError::TooManySequences` if the limit is exceeded.
pub fn parse_fasta_file(path: &Path) -> Result<Vec<Sequence>, ParseError> {
    let file = std::fs::File::open(path)?;

    if is_gzipped(path) {
        let reader = BufReader::new(MultiGzDecoder::new(file));
        parse_fasta_reader(&mut fasta::io::Reader::new(reader))
    } else {
        let reader = BufReader::new(file);
        parse_fasta_reader(&mut fasta::io::Reader::new(reader))
    }
}

/// Parse every sequence in FASTA text.
///
/// # Errors
///
/// Same as [`parse_fasta_file`], minus I/O failures.
pub fn parse_fasta_str(text: &str) -> Result<Vec<Sequence>, ParseError> {
    parse_fasta_reader(&mut fasta::io::Reader::new(text.as_bytes()))
}

/// Extract the query sequence from user input.
///
/// FASTA input yields its first record. Text without a `>` header is read as
/// bare residues (whitespace ignored) named [`RAW_QUERY_NAME`].
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if no residues are found and
/// `ParseError::InvalidSequence` if a residue is not a nucleotide code.
pub fn parse_query(text: &str) -> Result<Sequence, ParseError> {
    let trimmed = text.trim_start();

    let query = if trimmed.starts_with('>') {
        parse_fasta_str(trimmed)?
            .into_iter()
            .next()
            .ok_or_else(|| ParseError::InvalidFormat("no sequence records".to_string()))?
    } else {
        let residues: Vec<u8> = trimmed
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        Sequence::new(RAW_QUERY_NAME, residues)
    };

    if query.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No valid DNA sequence found in the provided input".to_string(),
        ));
    }
    validate_residues(&query)?;

    Ok(query)
}

/// # Errors
///
/// Returns `ParseError::InvalidSequence` for the first residue that is not an
/// IUPAC nucleotide code.
pub fn validate_residues(sequence: &Sequence) -> Result<(), ParseError> {
    match find_invalid_residue(sequence.bases()) {
        Some((position, symbol)) => Err(ParseError::InvalidSequence {
            name: sequence.name().to_string(),
            position,
            symbol,
        }),
        None => Ok(()),
    }
}

/// Parse from a noodles FASTA reader
fn parse_fasta_reader<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<Vec<Sequence>, ParseError> {
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        // Check sequence limit for DOS protection
        if check_sequence_limit(sequences.len()).is_some() {
            return Err(ParseError::TooManySequences(sequences.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        sequences.push(Sequence::new(name, record.sequence().as_ref()));
    }

    if sequences.is_empty() {
        return Err(ParseError::InvalidFormat(
            "No sequences found in FASTA input".to_string(),
        ));
    }

    Ok(sequences)
}
