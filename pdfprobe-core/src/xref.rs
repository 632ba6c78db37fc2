//! Cross-reference table: locating it from the file tail, parsing its
//! subsections, and decoding the trailer dictionary.
//!
//! Only classical `xref` tables are handled. A `startxref` offset that
//! lands on an indirect object means the file uses a cross-reference
//! stream (PDF 1.5+), which this reader rejects.

use crate::error::{ParseError, ParseResult};
use crate::lexer::{is_pdf_whitespace, Lexer, Token};
use crate::objects::{PdfDictionary, PdfObject};
use crate::tape::Tape;
use log::warn;
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Bytes scanned backward from the end of the file for `startxref`.
const TAIL_WINDOW: usize = 1024;

/// Fixed-width entry: 10-digit offset, space, 5-digit generation, space,
/// status byte. The trailing EOL is consumed as ordinary whitespace.
const ENTRY_WIDTH: usize = 18;

/// Status of one cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// `n`: the object lives at the recorded offset
    InUse,
    /// `f`: a hole in the free list
    Free,
    /// Unrecognized status byte; resolving through this entry fails
    Unknown,
}

/// One cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Byte offset of the object (for in-use entries)
    pub offset: u64,
    /// Generation number
    pub generation: u32,
    pub status: EntryStatus,
}

impl XRefEntry {
    pub fn in_use(&self) -> bool {
        self.status == EntryStatus::InUse
    }
}

/// The cross-reference table and its trailer dictionary.
#[derive(Debug, Clone)]
pub struct XRefTable {
    entries: HashMap<(u32, u32), XRefEntry>,
    trailer: PdfDictionary,
}

impl XRefTable {
    /// Locate the table through the tail scan, then parse it and its
    /// trailer. Leaves the tape positioned after the trailer epilogue.
    pub fn parse<R: Read + Seek>(tape: &mut Tape<R>) -> ParseResult<Self> {
        let pos = Self::locate_startxref(tape)?;
        tape.rewind();
        tape.seek(pos)?;
        Self::parse_table(tape)
    }

    /// Scan a backward window from the end of the file for the last
    /// `startxref` and return the offset on the following line.
    fn locate_startxref<R: Read + Seek>(tape: &mut Tape<R>) -> ParseResult<u64> {
        tape.seek_end();
        let window = tape.read(TAIL_WINDOW)?;

        let needle = b"startxref";
        let at = window
            .windows(needle.len())
            .rposition(|w| w == needle)
            .ok_or(ParseError::XRefNotFound)?;

        let mut i = at + needle.len();
        while i < window.len() && is_pdf_whitespace(window[i]) {
            i += 1;
        }
        let digits_start = i;
        while i < window.len() && window[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return Err(ParseError::XRefMalformed(
                "no offset after startxref".to_string(),
            ));
        }

        let digits = String::from_utf8_lossy(&window[digits_start..i]).into_owned();
        let pos = digits.parse::<u64>().map_err(|_| {
            ParseError::XRefMalformed(format!("startxref offset '{digits}' out of range"))
        })?;
        if pos >= tape.len() {
            return Err(ParseError::XRefMalformed(
                "startxref offset beyond end of file".to_string(),
            ));
        }
        Ok(pos)
    }

    /// Parse `xref`, its subsections, `trailer`, the trailer dictionary,
    /// and the `startxref`/`%%EOF` epilogue at the current tape position.
    fn parse_table<R: Read + Seek>(tape: &mut Tape<R>) -> ParseResult<Self> {
        let mut lexer = Lexer::new(tape);

        match lexer.next_token()? {
            Token::Xref => {}
            Token::Integer(_) => {
                return Err(ParseError::XRefMalformed("not a classical xref".to_string()))
            }
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected xref keyword, found {other:?}"
                )))
            }
        }

        let mut entries = HashMap::new();
        loop {
            match lexer.next_token()? {
                Token::Trailer => break,
                Token::Integer(first) => {
                    let first = u32::try_from(first).map_err(|_| {
                        ParseError::XRefMalformed(format!("bad subsection start {first}"))
                    })?;
                    let count = match lexer.next_token()? {
                        Token::Integer(c) => u32::try_from(c).map_err(|_| {
                            ParseError::XRefMalformed(format!("bad subsection count {c}"))
                        })?,
                        other => {
                            return Err(ParseError::XRefMalformed(format!(
                                "expected subsection count, found {other:?}"
                            )))
                        }
                    };
                    for i in 0..count {
                        let number = first.checked_add(i).ok_or_else(|| {
                            ParseError::XRefMalformed("object number overflow".to_string())
                        })?;
                        lexer.skip_whitespace()?;
                        let raw = lexer.read_bytes(ENTRY_WIDTH)?;
                        let entry = Self::parse_entry(number, &raw)?;
                        entries.insert((number, entry.generation), entry);
                    }
                }
                other => {
                    return Err(ParseError::XRefMalformed(format!(
                        "unexpected token in xref table: {other:?}"
                    )))
                }
            }
        }

        let trailer = match PdfObject::parse(&mut lexer)? {
            PdfObject::Dictionary(d) => d,
            _ => {
                return Err(ParseError::XRefMalformed(
                    "trailer is not a dictionary".to_string(),
                ))
            }
        };
        if trailer.get(b"Size").and_then(|o| o.as_integer()).is_none() {
            return Err(ParseError::MissingKey("Size".to_string()));
        }

        match lexer.next_token()? {
            Token::StartXRef => {}
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected startxref after trailer, found {other:?}"
                )))
            }
        }
        match lexer.next_token()? {
            Token::Integer(_) => {}
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected offset after startxref, found {other:?}"
                )))
            }
        }
        match lexer.next_token()? {
            Token::Comment(c) if c == "%EOF" => {}
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected %%EOF, found {other:?}"
                )))
            }
        }

        Ok(XRefTable { entries, trailer })
    }

    fn parse_entry(number: u32, raw: &[u8]) -> ParseResult<XRefEntry> {
        let offset = std::str::from_utf8(&raw[0..10])
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                ParseError::XRefMalformed(format!("bad offset in entry for object {number}"))
            })?;
        let generation = std::str::from_utf8(&raw[11..16])
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                ParseError::XRefMalformed(format!("bad generation in entry for object {number}"))
            })?;

        let status = match raw[17] {
            b'n' => EntryStatus::InUse,
            b'f' => EntryStatus::Free,
            other => {
                warn!("object {number}: unknown xref entry status byte 0x{other:02x}");
                EntryStatus::Unknown
            }
        };

        Ok(XRefEntry {
            offset,
            generation,
            status,
        })
    }

    /// Look up an entry by object number and generation.
    pub fn entry(&self, number: u32, generation: u32) -> Option<&XRefEntry> {
        self.entries.get(&(number, generation))
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &PdfDictionary {
        &self.trailer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All in-use references, ordered by object number then generation.
    pub fn in_use_references(&self) -> Vec<(u32, u32)> {
        let mut refs: Vec<(u32, u32)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.in_use())
            .map(|(key, _)| *key)
            .collect();
        refs.sort_unstable();
        refs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &XRefEntry)> {
        self.entries.iter()
    }
}
