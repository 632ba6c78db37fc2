//! Error types shared by every layer of the reader.

use thiserror::Error;

/// Result type for all reader operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Failures surfaced by the tape, the parsers, the xref engine and the
/// resolver. All of them terminate the session; nothing is retried.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("seek target {0} is out of bounds")]
    SeekOutOfBounds(u64),

    #[error("syntax error in {context}: {message}")]
    Syntax { context: &'static str, message: String },

    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("startxref not found in file tail")]
    XRefNotFound,

    #[error("malformed xref: {0}")]
    XRefMalformed(String),

    #[error("unresolved object: {0} {1} R")]
    UnresolvedObject(u32, u32),

    #[error("reference chain exceeds the chase limit")]
    CircularReference,

    #[error("missing required key: {0}")]
    MissingKey(String),

    #[error("document catalog root missing or not a dictionary")]
    RootNotFound,

    #[error("pages tree root missing or not a dictionary")]
    PagesNotFound,

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl ParseError {
    pub(crate) fn syntax(context: &'static str, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            context,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::UnresolvedObject(7, 0);
        assert_eq!(err.to_string(), "unresolved object: 7 0 R");

        let err = ParseError::syntax("header", "file too short");
        assert_eq!(err.to_string(), "syntax error in header: file too short");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ParseError::from(io);
        assert!(matches!(err, ParseError::Io(_)));
    }
}
