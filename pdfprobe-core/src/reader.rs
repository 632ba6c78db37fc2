//! Indirect object access: seeking to xref offsets, parsing `N G obj`
//! wrappers, and chasing reference-valued bodies.

use crate::error::{ParseError, ParseResult};
use crate::header::PdfHeader;
use crate::lexer::{Lexer, Token};
use crate::objects::{PdfDictionary, PdfObject, PdfStream};
use crate::tape::Tape;
use crate::xref::{EntryStatus, XRefTable};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// An object body may be a bare reference aliasing another object; chains
/// longer than this fail instead of looping.
const MAX_REFERENCE_CHAIN: usize = 32;

/// Low-level reader: the tape plus the structures located at attach time.
pub struct PdfReader<R: Read + Seek> {
    tape: Tape<R>,
    header: PdfHeader,
    xref: XRefTable,
}

impl PdfReader<BufReader<File>> {
    /// Open a PDF file from a path. The handle stays owned by the reader
    /// and is released when the reader is dropped.
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> PdfReader<R> {
    /// Read the header and the cross-reference table from a seekable
    /// source.
    pub fn new(source: R) -> ParseResult<Self> {
        let mut tape = Tape::new(source)?;
        let header = PdfHeader::parse(&mut tape)?;
        let xref = XRefTable::parse(&mut tape)?;
        Ok(Self { tape, header, xref })
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    pub fn trailer(&self) -> &PdfDictionary {
        self.xref.trailer()
    }

    /// Fetch the object stored under `(number, generation)`. The body is
    /// returned as parsed; a bare reference body is *not* chased.
    pub fn get_object(&mut self, number: u32, generation: u32) -> ParseResult<PdfObject> {
        self.fetch(number, generation, 0)
    }

    /// Fetch `(number, generation)` and chase reference-valued bodies
    /// until a real object appears.
    pub fn resolve_ref(&mut self, number: u32, generation: u32) -> ParseResult<PdfObject> {
        self.resolve_depth(number, generation, 0)
    }

    /// Resolve an object in place: references are chased, everything else
    /// is returned as-is.
    pub fn resolve(&mut self, object: &PdfObject) -> ParseResult<PdfObject> {
        match object {
            PdfObject::Reference(number, generation) => self.resolve_ref(*number, *generation),
            other => Ok(other.clone()),
        }
    }

    /// Read the raw (still encoded) body bytes of a stream, resolving a
    /// reference-valued `Length` if needed.
    pub fn stream_data(&mut self, stream: &PdfStream) -> ParseResult<Vec<u8>> {
        let length = match stream.dict.get(b"Length") {
            Some(PdfObject::Integer(n)) if *n >= 0 => *n as u64,
            Some(PdfObject::Reference(number, generation)) => {
                let (number, generation) = (*number, *generation);
                self.resolve_ref(number, generation)?
                    .as_integer()
                    .filter(|n| *n >= 0)
                    .ok_or_else(|| {
                        ParseError::syntax("stream", "resolved Length is not a non-negative integer")
                    })? as u64
            }
            _ => return Err(ParseError::MissingKey("Length".to_string())),
        };

        match stream.data_offset.checked_add(length) {
            Some(end) if end <= self.tape.len() => {}
            _ => {
                return Err(ParseError::syntax(
                    "stream",
                    "body extends beyond end of file",
                ))
            }
        }

        self.tape.rewind();
        self.tape.seek(stream.data_offset)?;
        self.tape.read(length as usize)
    }

    fn resolve_depth(
        &mut self,
        mut number: u32,
        mut generation: u32,
        depth: usize,
    ) -> ParseResult<PdfObject> {
        for hop in 0..MAX_REFERENCE_CHAIN {
            match self.fetch(number, generation, depth + hop)? {
                PdfObject::Reference(n, g) => {
                    number = n;
                    generation = g;
                }
                object => return Ok(object),
            }
        }
        Err(ParseError::CircularReference)
    }

    fn fetch(&mut self, number: u32, generation: u32, depth: usize) -> ParseResult<PdfObject> {
        if depth > MAX_REFERENCE_CHAIN {
            return Err(ParseError::CircularReference);
        }

        let entry = *self
            .xref
            .entry(number, generation)
            .ok_or(ParseError::UnresolvedObject(number, generation))?;
        match entry.status {
            EntryStatus::InUse => {}
            EntryStatus::Free => return Err(ParseError::UnresolvedObject(number, generation)),
            EntryStatus::Unknown => {
                return Err(ParseError::XRefMalformed(format!(
                    "entry for {number} {generation} R has unknown status"
                )))
            }
        }

        self.tape.rewind();
        self.tape.seek(entry.offset)?;

        let (object, deferred_length) = {
            let mut lexer = Lexer::new(&mut self.tape);
            Self::parse_indirect(&mut lexer, number, generation)?
        };

        // a reference-valued stream Length pauses body skipping: resolve
        // the length, then re-seek past the body and finish the wrapper
        if let Some((len_number, len_generation, data_offset)) = deferred_length {
            let length = self
                .resolve_depth(len_number, len_generation, depth + 1)?
                .as_integer()
                .filter(|n| *n >= 0)
                .ok_or_else(|| {
                    ParseError::syntax("stream", "resolved Length is not a non-negative integer")
                })?;
            let end = data_offset.checked_add(length as u64).ok_or_else(|| {
                ParseError::syntax("stream", "body extends beyond end of file")
            })?;
            self.tape.rewind();
            self.tape.seek(end)?;
            let mut lexer = Lexer::new(&mut self.tape);
            lexer.expect(&Token::EndStream)?;
            lexer.expect(&Token::EndObj)?;
        }

        Ok(object)
    }

    /// Parse `N G obj <body> endobj` at the lexer position, verifying the
    /// numbers match the xref entry that sent us here. For a stream whose
    /// `Length` is a reference, the body is left unskipped and the
    /// reference is handed back to the caller.
    fn parse_indirect(
        lexer: &mut Lexer<R>,
        number: u32,
        generation: u32,
    ) -> ParseResult<(PdfObject, Option<(u32, u32, u64)>)> {
        let found = match lexer.next_token()? {
            Token::Integer(n) => n,
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected object number at entry offset, found {other:?}"
                )))
            }
        };
        if found != i64::from(number) {
            return Err(ParseError::XRefMalformed(format!(
                "object number mismatch: expected {number}, found {found}"
            )));
        }

        let found = match lexer.next_token()? {
            Token::Integer(g) => g,
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected generation number, found {other:?}"
                )))
            }
        };
        if found != i64::from(generation) {
            return Err(ParseError::XRefMalformed(format!(
                "generation mismatch: expected {generation}, found {found}"
            )));
        }

        match lexer.next_token()? {
            Token::Obj => {}
            other => {
                return Err(ParseError::XRefMalformed(format!(
                    "expected obj keyword, found {other:?}"
                )))
            }
        }

        let object = PdfObject::parse(lexer)?;

        let deferred = match &object {
            PdfObject::Stream(s) => match s.dict.get(b"Length") {
                Some(PdfObject::Reference(n, g)) => Some((*n, *g, s.data_offset)),
                _ => None,
            },
            _ => None,
        };

        if deferred.is_none() {
            lexer.expect(&Token::EndObj)?;
        }

        Ok((object, deferred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::PdfName;
    use std::io::Cursor;

    /// Assemble a file whose xref offsets are recorded while the objects
    /// are written, so the table is correct by construction. Object
    /// numbers absent from `objects` become free entries.
    fn build_pdf(objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
        let mut buf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (number, body) in objects {
            offsets.push((*number, buf.len()));
            buf.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
        }

        let xref_at = buf.len();
        let size = objects.iter().map(|(n, _)| n + 1).max().unwrap_or(1);
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for number in 1..size {
            match offsets.iter().find(|(n, _)| *n == number) {
                Some((_, at)) => xref.push_str(&format!("{at:010} 00000 n \n")),
                None => xref.push_str("0000000000 65535 f \n"),
            }
        }
        buf.extend_from_slice(xref.as_bytes());
        buf.extend_from_slice(
            format!("trailer\n<< /Size {size}{trailer_extra} >>\nstartxref\n{xref_at}\n%%EOF")
                .as_bytes(),
        );
        buf
    }

    fn reader(bytes: Vec<u8>) -> PdfReader<Cursor<Vec<u8>>> {
        PdfReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_get_object() {
        let pdf = build_pdf(&[(1, "<< /Type /Catalog >>"), (2, "42")], "");
        let mut r = reader(pdf);

        assert_eq!(r.get_object(2, 0).unwrap(), PdfObject::Integer(42));
        let obj = r.get_object(1, 0).unwrap();
        assert_eq!(
            obj.as_dict().unwrap().get(b"Type"),
            Some(&PdfObject::Name(PdfName::new("Catalog")))
        );
    }

    #[test]
    fn test_resolve_chases_alias_chain() {
        let pdf = build_pdf(&[(5, "6 0 R"), (6, "<< /Type /X >>")], "");
        let mut r = reader(pdf);

        // the raw body is a reference, resolution chases it
        assert_eq!(r.get_object(5, 0).unwrap(), PdfObject::Reference(6, 0));
        let resolved = r.resolve_ref(5, 0).unwrap();
        assert_eq!(
            resolved.as_dict().unwrap().get(b"Type"),
            Some(&PdfObject::Name(PdfName::new("X")))
        );
    }

    #[test]
    fn test_resolve_cycle_fails() {
        let pdf = build_pdf(&[(5, "6 0 R"), (6, "5 0 R")], "");
        let mut r = reader(pdf);
        assert!(matches!(
            r.resolve_ref(5, 0),
            Err(ParseError::CircularReference)
        ));
    }

    #[test]
    fn test_missing_and_free_entries_are_unresolved() {
        let pdf = build_pdf(&[(3, "1")], "");
        let mut r = reader(pdf);

        // objects 1 and 2 exist only as free entries
        assert!(matches!(
            r.resolve_ref(1, 65535),
            Err(ParseError::UnresolvedObject(1, 65535))
        ));
        // no entry at all under this key
        assert!(matches!(
            r.resolve_ref(9, 0),
            Err(ParseError::UnresolvedObject(9, 0))
        ));
    }

    #[test]
    fn test_unknown_status_entry_fails_on_resolve() {
        let mut pdf = build_pdf(&[(1, "42")], "");
        // corrupt the status byte of the entry for object 1
        let entry = b"00000 n \n".to_vec();
        let at = pdf
            .windows(entry.len())
            .rposition(|w| w == entry.as_slice())
            .unwrap();
        pdf[at + 6] = b'x';

        let mut r = reader(pdf);
        assert!(matches!(
            r.resolve_ref(1, 0),
            Err(ParseError::XRefMalformed(_))
        ));
    }

    #[test]
    fn test_object_number_mismatch_is_malformed() {
        // the xref entry for object 2 points at object 1
        let header = b"%PDF-1.4\n";
        let obj1 = b"1 0 obj\n42\nendobj\n";
        let obj1_at = header.len();
        let xref_at = obj1_at + obj1.len();
        let mut pdf = header.to_vec();
        pdf.extend_from_slice(obj1);
        pdf.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f \n0000000000 65535 f \n{obj1_at:010} 00000 n \ntrailer\n<< /Size 3 >>\nstartxref\n{xref_at}\n%%EOF"
            )
            .as_bytes(),
        );

        let mut r = reader(pdf);
        assert!(matches!(
            r.get_object(2, 0),
            Err(ParseError::XRefMalformed(_))
        ));
    }

    #[test]
    fn test_stream_with_literal_length() {
        let pdf = build_pdf(
            &[(1, "<< /Length 11 >>\nstream\nhello world\nendstream")],
            "",
        );
        let mut r = reader(pdf);

        let obj = r.resolve_ref(1, 0).unwrap();
        let stream = obj.as_stream().unwrap().clone();
        assert_eq!(r.stream_data(&stream).unwrap(), b"hello world");
    }

    #[test]
    fn test_stream_with_reference_length() {
        let pdf = build_pdf(
            &[
                (1, "<< /Length 2 0 R >>\nstream\nhello world\nendstream"),
                (2, "11"),
            ],
            "",
        );
        let mut r = reader(pdf);

        let obj = r.resolve_ref(1, 0).unwrap();
        let stream = obj.as_stream().unwrap().clone();
        assert_eq!(
            stream.dict.get(b"Length"),
            Some(&PdfObject::Reference(2, 0))
        );
        assert_eq!(r.stream_data(&stream).unwrap(), b"hello world");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let pdf = build_pdf(&[(1, "[1 2 3]")], "");
        let mut r = reader(pdf);
        let first = r.resolve_ref(1, 0).unwrap();
        let second = r.resolve_ref(1, 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_passthrough_for_direct_objects() {
        let pdf = build_pdf(&[(1, "42")], "");
        let mut r = reader(pdf);
        let direct = PdfObject::Boolean(true);
        assert_eq!(r.resolve(&direct).unwrap(), direct);
        assert_eq!(
            r.resolve(&PdfObject::Reference(1, 0)).unwrap(),
            PdfObject::Integer(42)
        );
    }
}
