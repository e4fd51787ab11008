//! Parsers for sequence input.
//!
//! - **FASTA files**: Reference sequences, plain or gzip/bgzip compressed
//! - **Query text**: A FASTA record or bare residues submitted for search
//!
//! ## Example
//!
//! ```rust,no_run
//! use seq_kin::parsing::fasta::{parse_fasta_file, parse_query};
//! use std::path::Path;
//!
//! let references = parse_fasta_file(Path::new("viruses/hiv1.fasta")).unwrap();
//! let query = parse_query(">sample\nACGTTGCA\n").unwrap();
//! ```

pub mod fasta;
