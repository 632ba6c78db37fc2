//! Stream filter catalog.
//!
//! Filters are identified, not applied: `FlateDecode` is the one name this
//! reader recognizes as its own, everything else is carried as
//! unsupported. Body bytes handed out by the resolver stay encoded.

use crate::error::{ParseError, ParseResult};
use crate::objects::{PdfDictionary, PdfObject};

/// A stream filter named by a `/Filter` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// zlib/deflate compression
    FlateDecode,
    /// Any other filter name
    Unsupported(Vec<u8>),
}

impl Filter {
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"FlateDecode" => Filter::FlateDecode,
            other => Filter::Unsupported(other.to_vec()),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Filter::FlateDecode)
    }
}

/// Read a stream dictionary's `/Filter` entry: absent means no filters, a
/// name means one, an array of names means a chain applied in order.
pub fn stream_filters(dict: &PdfDictionary) -> ParseResult<Vec<Filter>> {
    match dict.get(b"Filter") {
        None => Ok(Vec::new()),
        Some(PdfObject::Name(name)) => Ok(vec![Filter::from_name(name.as_bytes())]),
        Some(PdfObject::Array(array)) => {
            let mut filters = Vec::with_capacity(array.len());
            for element in array.iter() {
                match element {
                    PdfObject::Name(name) => filters.push(Filter::from_name(name.as_bytes())),
                    other => {
                        return Err(ParseError::syntax(
                            "stream",
                            format!("non-name entry in Filter array: {other}"),
                        ))
                    }
                }
            }
            Ok(filters)
        }
        Some(other) => Err(ParseError::syntax(
            "stream",
            format!("Filter is neither a name nor an array: {other}"),
        )),
    }
}
