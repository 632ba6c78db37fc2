//! PDF header parsing: the `%PDF-M.N` marker in the first 8 bytes.

use crate::error::{ParseError, ParseResult};
use crate::tape::Tape;
use std::fmt;
use std::io::{Read, Seek};

/// PDF version information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Versions whose files carry classical cross-reference tables
    /// (1.5 introduced xref streams, but kept classical tables legal).
    pub fn is_classical(&self) -> bool {
        self.major == 1 && self.minor <= 7
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parsed file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfHeader {
    pub version: PdfVersion,
}

impl PdfHeader {
    /// Read the first 8 bytes of the tape and parse `%PDF-M.N`.
    pub fn parse<R: Read + Seek>(tape: &mut Tape<R>) -> ParseResult<Self> {
        tape.rewind();
        let bytes = tape.read(8)?;
        if bytes.len() < 8 {
            return Err(ParseError::syntax("header", "file shorter than 8 bytes"));
        }

        if &bytes[0..5] != b"%PDF-" {
            return Err(ParseError::syntax("header", "missing %PDF- marker"));
        }

        let (major, dot, minor) = (bytes[5], bytes[6], bytes[7]);
        if !major.is_ascii_digit() || dot != b'.' || !minor.is_ascii_digit() {
            return Err(ParseError::syntax(
                "header",
                format!(
                    "malformed version '{}'",
                    String::from_utf8_lossy(&bytes[5..8])
                ),
            ));
        }

        Ok(PdfHeader {
            version: PdfVersion::new(major - b'0', minor - b'0'),
        })
    }
}
