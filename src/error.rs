//! Error types for the PDF stamping library

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF stamping library
#[derive(Error, Debug)]
pub enum Error {
    /// Instruction source had no rows at all, not even a header
    #[error("instruction input is empty (no header row)")]
    EmptyInput,

    /// Structurally invalid instruction row
    #[error("malformed row on line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// Page number parsed but is below 1
    #[error("invalid page number {page} on line {line}: pages start at 1")]
    InvalidPageNumber { line: u64, page: i64 },

    /// Page number listed more than once
    #[error("duplicate page number {page} on line {line}")]
    DuplicatePage { line: u64, page: usize },

    /// PDF source is empty, unreadable or structurally corrupt
    #[error("invalid or corrupt PDF input: {0}")]
    InvalidPdf(String),

    /// Instruction references a page past the end of the document
    #[error("page {page} is out of range: PDF has {total} pages")]
    PageOutOfRange { page: usize, total: usize },

    /// Rendering collaborator failed while applying stamps
    #[error("stamping failed: {0}")]
    Stamping(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification of an [`Error`] without its diagnostic payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyInput,
    MalformedRow,
    InvalidPageNumber,
    DuplicatePage,
    InvalidPdf,
    PageOutOfRange,
    Stamping,
    Io,
}

impl Error {
    /// The kind of this error, for callers that only branch on classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput => ErrorKind::EmptyInput,
            Error::MalformedRow { .. } => ErrorKind::MalformedRow,
            Error::InvalidPageNumber { .. } => ErrorKind::InvalidPageNumber,
            Error::DuplicatePage { .. } => ErrorKind::DuplicatePage,
            Error::InvalidPdf(_) => ErrorKind::InvalidPdf,
            Error::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            Error::Stamping(_) => ErrorKind::Stamping,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Error::EmptyInput.kind(), ErrorKind::EmptyInput);
        assert_eq!(
            Error::PageOutOfRange { page: 10, total: 3 }.kind(),
            ErrorKind::PageOutOfRange
        );
        assert_eq!(Error::InvalidPdf("empty".into()).kind(), ErrorKind::InvalidPdf);
    }

    #[test]
    fn test_messages_carry_context() {
        let err = Error::MalformedRow { line: 2, reason: "invalid page number \"abc\"".into() };
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("abc"));

        let err = Error::PageOutOfRange { page: 10, total: 3 };
        assert_eq!(err.to_string(), "page 10 is out of range: PDF has 3 pages");
    }
}
