//! Centralized validation and helper functions.

/// Maximum number of sequences accepted from a single file (DOS protection)
pub const MAX_SEQUENCES: usize = 100_000;

/// Longest upload filename accepted
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Extensions accepted on uploaded query files
const QUERY_EXTENSIONS: &[&str] = &["fasta", "fa", "fna", "fas", "txt"];

/// IUPAC nucleotide codes, uppercase
const NUCLEOTIDE_CODES: &[u8] = b"ACGTUNRYSWKMBDHV";

/// True if `symbol` is an IUPAC nucleotide code (either case)
#[must_use]
pub fn is_nucleotide(symbol: u8) -> bool {
    NUCLEOTIDE_CODES.contains(&symbol.to_ascii_uppercase())
}

/// Position and value of the first residue that is not a nucleotide code.
///
/// # Examples
///
/// ```
/// use seq_kin::utils::validation::find_invalid_residue;
///
/// assert_eq!(find_invalid_residue(b"ACGTN"), None);
/// assert_eq!(find_invalid_residue(b"ACXT"), Some((2, 'X')));
/// ```
#[must_use]
pub fn find_invalid_residue(bases: &[u8]) -> Option<(usize, char)> {
    bases
        .iter()
        .position(|&b| !is_nucleotide(b))
        .map(|i| (i, char::from(bases[i])))
}

/// Check if adding another sequence would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES}"
        ))
    } else {
        None
    }
}

/// Security validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Filename too long: exceeds {MAX_FILENAME_LENGTH} characters")]
    FilenameTooLong,
    #[error("Invalid filename: contains path traversal or invalid characters")]
    InvalidFilename,
    #[error("Empty filename provided")]
    EmptyFilename,
    #[error("File content appears malformed or invalid")]
    InvalidFileContent,
}

/// Check an uploaded query filename and reduce it to a safe display name.
///
/// The name must be a bare file name with one of the query extensions
/// (`.fasta`, `.fa`, `.fna`, `.fas`, `.txt`) and a non-empty stem. Characters
/// other than ASCII alphanumerics, `.`, `-`, `_` and space are dropped.
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if the filename is blank,
/// `ValidationError::FilenameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidFilename` if it contains a path or control
/// characters, or lacks a query extension.
pub fn validate_filename(filename: &str) -> Result<String, ValidationError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    if filename.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong);
    }
    if filename.contains(['/', '\\']) || filename.contains("..") || filename.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFilename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect();

    match query_file_stem(&sanitized) {
        Some(_) => Ok(sanitized),
        None => Err(ValidationError::InvalidFilename),
    }
}

/// The part of `filename` before a query extension, if it has one and the
/// stem is usable as a sequence name
#[must_use]
pub fn query_file_stem(filename: &str) -> Option<&str> {
    let (stem, extension) = filename.rsplit_once('.')?;
    let known = QUERY_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension));
    let stem = stem.trim();
    (known && !stem.is_empty() && !stem.starts_with('.')).then_some(stem)
}

/// Check that an uploaded query is plain text.
///
/// Sequence files are ASCII; whitespace is the only control character allowed.
///
/// # Errors
///
/// Returns `ValidationError::InvalidFileContent` if the content is blank, is
/// not UTF-8, or contains other control characters.
pub fn validate_file_content(content: &[u8]) -> Result<(), ValidationError> {
    let Ok(text) = std::str::from_utf8(content) else {
        return Err(ValidationError::InvalidFileContent);
    };
    if text.trim().is_empty() {
        return Err(ValidationError::InvalidFileContent);
    }
    if text
        .chars()
        .any(|c| c.is_control() && !c.is_ascii_whitespace())
    {
        return Err(ValidationError::InvalidFileContent);
    }
    Ok(())
}

/// Filename and content checks for an uploaded query file
///
/// # Errors
///
/// Returns a `ValidationError` if filename validation or content validation fails.
pub fn validate_upload(
    filename: Option<&str>,
    content: &[u8],
) -> Result<Option<String>, ValidationError> {
    let validated_filename = if let Some(name) = filename {
        Some(validate_filename(name)?)
    } else {
        None
    };

    validate_file_content(content)?;

    Ok(validated_filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nucleotide() {
        for b in b"ACGTNacgtnRYKM" {
            assert!(is_nucleotide(*b), "{} should be valid", char::from(*b));
        }
        for b in b"XZ-*1 >" {
            assert!(!is_nucleotide(*b), "{} should be invalid", char::from(*b));
        }
    }

    #[test]
    fn test_find_invalid_residue() {
        assert_eq!(find_invalid_residue(b""), None);
        assert_eq!(find_invalid_residue(b"acgu"), None);
        assert_eq!(find_invalid_residue(b"AC-GT"), Some((2, '-')));
    }

    #[test]
    fn test_check_sequence_limit() {
        assert!(check_sequence_limit(100).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES - 1).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES).is_some());
    }

    #[test]
    fn test_validate_filename_safe() {
        assert!(validate_filename("query.fasta").is_ok());
        assert!(validate_filename("my-virus.fa").is_ok());
        assert!(validate_filename("sample 123.fna").is_ok());
    }

    #[test]
    fn test_validate_filename_dangerous() {
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("..\\windows\\system32").is_err());
        assert!(validate_filename("test\0.fa").is_err());
        assert!(validate_filename("test\x01.fa").is_err());
        assert!(validate_filename(&"a".repeat(300)).is_err());
        assert!(validate_filename("   ").is_err());
        assert!(validate_filename(".hidden").is_err());
        assert!(validate_filename(".fasta").is_err());
        assert!(validate_filename("notes.doc").is_err());
    }

    #[test]
    fn test_validate_filename_sanitization() {
        assert_eq!(validate_filename("virus@#$%1.fasta").unwrap(), "virus1.fasta");
        assert_eq!(validate_filename("  Sample.FA ").unwrap(), "Sample.FA");
    }

    #[test]
    fn test_validate_file_content() {
        assert!(validate_file_content(b">q\nACGT\n").is_ok());
        assert!(validate_file_content(b"").is_err());
        assert!(validate_file_content(&vec![0u8; 1000]).is_err());
        assert!(validate_file_content(&[0xff, 0xfe, b'A']).is_err());
        assert!(validate_file_content(b" \n\t").is_err());
        assert!(validate_file_content(b">q\r\nACGT\tN\r\n").is_ok());
    }

    #[test]
    fn test_query_file_stem() {
        assert_eq!(query_file_stem("hiv-1 ref.fasta"), Some("hiv-1 ref"));
        assert_eq!(query_file_stem("sample.v2.FA"), Some("sample.v2"));
        assert_eq!(query_file_stem(".fa"), None);
        assert_eq!(query_file_stem("sample.fa.gz"), None);
        assert_eq!(query_file_stem("sample"), None);
    }

    #[test]
    fn test_validate_upload() {
        let content = b">q\nACGT\n";
        assert_eq!(
            validate_upload(Some("q.fa"), content).unwrap().as_deref(),
            Some("q.fa")
        );
        assert!(validate_upload(None, content).unwrap().is_none());
        assert!(validate_upload(Some("../q.fa"), content).is_err());
    }
}
