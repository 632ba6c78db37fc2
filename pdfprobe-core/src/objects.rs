//! PDF object model, grammar, and typed navigation.
//!
//! Objects are parsed from a token stream. Streams are never materialized:
//! a parsed stream carries its dictionary and the absolute offset of the
//! first body byte, and body access happens later through the resolver.

use crate::error::{ParseError, ParseResult};
use crate::lexer::{is_delimiter, is_pdf_whitespace, Lexer, Token};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek};

/// PDF name: a byte string, typically ASCII, hex escapes already decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdfName(pub Vec<u8>);

/// PDF string: an arbitrary byte string.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfString(pub Vec<u8>);

/// PDF array
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfArray(pub Vec<PdfObject>);

/// PDF dictionary; duplicate keys take the last occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDictionary(pub HashMap<PdfName, PdfObject>);

/// PDF stream: its dictionary plus the absolute offset of the first body
/// byte after the `stream` keyword's EOL. The body length comes from the
/// dictionary's `Length` entry, which may itself be an indirect reference.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data_offset: u64,
}

/// PDF object types
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(PdfName),
    Array(PdfArray),
    Dictionary(PdfDictionary),
    Stream(PdfStream),
    /// Indirect reference: object number and generation
    Reference(u32, u32),
}

impl PdfObject {
    /// Parse one object from the token stream.
    pub fn parse<R: Read + Seek>(lexer: &mut Lexer<R>) -> ParseResult<Self> {
        let token = lexer.next_token()?;
        Self::parse_from_token(lexer, token)
    }

    fn parse_from_token<R: Read + Seek>(
        lexer: &mut Lexer<R>,
        token: Token,
    ) -> ParseResult<Self> {
        match token {
            Token::Null => Ok(PdfObject::Null),
            Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
            Token::Integer(value) => Self::parse_integer_or_reference(lexer, value),
            Token::Real(r) => Ok(PdfObject::Real(r)),
            Token::String(s) => Ok(PdfObject::String(PdfString(s))),
            Token::Name(n) => Ok(PdfObject::Name(PdfName(n))),
            Token::ArrayStart => Self::parse_array(lexer),
            Token::DictStart => Self::parse_dictionary_or_stream(lexer),
            Token::Comment(_) => Self::parse(lexer),
            Token::Eof => Err(ParseError::syntax("object", "unexpected end of input")),
            other => Err(ParseError::UnexpectedToken {
                expected: "object".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    /// An integer may open an indirect reference `N G R`; decide with two
    /// tokens of lookahead and push back whatever does not belong to one.
    fn parse_integer_or_reference<R: Read + Seek>(
        lexer: &mut Lexer<R>,
        value: i64,
    ) -> ParseResult<Self> {
        let second = lexer.next_token()?;
        let generation = match second {
            Token::Integer(g) => g,
            other => {
                lexer.push_token(other);
                return Ok(PdfObject::Integer(value));
            }
        };

        let third = lexer.next_token()?;
        if third == Token::R {
            return match (u32::try_from(value), u32::try_from(generation)) {
                (Ok(number), Ok(generation)) => Ok(PdfObject::Reference(number, generation)),
                _ => Err(ParseError::syntax(
                    "object",
                    format!("reference {value} {generation} R out of range"),
                )),
            };
        }
        lexer.push_token(third);
        lexer.push_token(Token::Integer(generation));
        Ok(PdfObject::Integer(value))
    }

    fn parse_array<R: Read + Seek>(lexer: &mut Lexer<R>) -> ParseResult<Self> {
        let mut elements = Vec::new();

        loop {
            let token = lexer.next_token()?;
            match token {
                Token::ArrayEnd => break,
                Token::Comment(_) => continue,
                _ => elements.push(Self::parse_from_token(lexer, token)?),
            }
        }

        Ok(PdfObject::Array(PdfArray(elements)))
    }

    fn parse_dictionary_or_stream<R: Read + Seek>(lexer: &mut Lexer<R>) -> ParseResult<Self> {
        let dict = Self::parse_dictionary_inner(lexer)?;

        loop {
            let token = lexer.next_token()?;
            match token {
                Token::Stream => return Self::parse_stream_after_dict(lexer, dict),
                Token::Comment(_) => continue,
                other => {
                    lexer.push_token(other);
                    return Ok(PdfObject::Dictionary(dict));
                }
            }
        }
    }

    fn parse_dictionary_inner<R: Read + Seek>(
        lexer: &mut Lexer<R>,
    ) -> ParseResult<PdfDictionary> {
        let mut dict = HashMap::new();

        loop {
            let token = lexer.next_token()?;
            match token {
                Token::DictEnd => break,
                Token::Comment(_) => continue,
                Token::Name(key) => {
                    let value = Self::parse(lexer)?;
                    dict.insert(PdfName(key), value);
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key or >>".to_string(),
                        found: format!("{other:?}"),
                    });
                }
            }
        }

        Ok(PdfDictionary(dict))
    }

    /// Record where the body starts, then skip it when the length is known
    /// here. A reference-valued `Length` leaves the body unskipped; the
    /// resolver re-seeks past it once the length is resolved.
    fn parse_stream_after_dict<R: Read + Seek>(
        lexer: &mut Lexer<R>,
        dict: PdfDictionary,
    ) -> ParseResult<Self> {
        lexer.read_stream_eol()?;
        let data_offset = lexer.offset();

        let length = match dict.get(b"Length") {
            Some(PdfObject::Integer(n)) if *n >= 0 => Some(*n as usize),
            Some(PdfObject::Reference(_, _)) => None,
            Some(_) => {
                return Err(ParseError::syntax(
                    "stream",
                    "Length is neither an integer nor a reference",
                ))
            }
            None => return Err(ParseError::MissingKey("Length".to_string())),
        };

        if let Some(n) = length {
            lexer.skip_bytes(n)?;
            lexer.expect(&Token::EndStream)?;
        }

        Ok(PdfObject::Stream(PdfStream { dict, data_offset }))
    }

    /// Check whether this object is null
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Natural view of a number: succeeds only on integers.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Widening view of a number: any integer or real.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Real(r) => Some(*r),
            PdfObject::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&PdfName> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Dictionaries and streams both answer; a stream projects to its
    /// stream dictionary.
    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&mut s.dict),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfObject::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<(u32, u32)> {
        match self {
            PdfObject::Reference(number, generation) => Some((*number, *generation)),
            _ => None,
        }
    }
}

impl PdfDictionary {
    pub fn new() -> Self {
        PdfDictionary(HashMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a value by key bytes.
    pub fn get(&self, key: &[u8]) -> Option<&PdfObject> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<PdfName>, value: PdfObject) {
        self.0.insert(key.into(), value);
    }

    /// Transform the value under `key` in place; absent keys leave the
    /// dictionary untouched.
    pub fn update<F: FnOnce(&mut PdfObject)>(&mut self, key: &[u8], f: F) {
        if let Some(value) = self.0.get_mut(key) {
            f(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PdfName, &PdfObject)> {
        self.0.iter()
    }
}

impl PdfArray {
    pub fn new() -> Self {
        PdfArray(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.0.get(index)
    }

    pub fn push(&mut self, object: PdfObject) {
        self.0.push(object);
    }

    /// Transform the element at `index` in place; out-of-range indexes
    /// leave the array untouched.
    pub fn update<F: FnOnce(&mut PdfObject)>(&mut self, index: usize, f: F) {
        if let Some(value) = self.0.get_mut(index) {
            f(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PdfObject> {
        self.0.iter()
    }
}

impl PdfString {
    pub fn new(data: Vec<u8>) -> Self {
        PdfString(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

impl PdfName {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        PdfName(name.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl Borrow<[u8]> for PdfName {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for PdfName {
    fn from(s: &str) -> Self {
        PdfName(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for PdfName {
    fn from(b: &[u8]) -> Self {
        PdfName(b.to_vec())
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for &b in &self.0 {
            if b == b'#' || is_delimiter(b) || is_pdf_whitespace(b) || !(0x21..=0x7E).contains(&b)
            {
                write!(f, "#{b:02X}")?;
            } else {
                write!(f, "{}", b as char)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for &b in &self.0 {
            match b {
                b'\\' => write!(f, "\\\\")?,
                b'(' => write!(f, "\\(")?,
                b')' => write!(f, "\\)")?,
                0x20..=0x7E => write!(f, "{}", b as char)?,
                _ => write!(f, "\\{b:03o}")?,
            }
        }
        write!(f, ")")
    }
}

impl fmt::Display for PdfArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{element}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for PdfDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // keys ordered so rendering is deterministic
        let mut keys: Vec<&PdfName> = self.0.keys().collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));

        write!(f, "<<")?;
        for key in keys {
            write!(f, " {} {}", key, self.0[key])?;
        }
        write!(f, " >>")
    }
}

/// Renders PDF syntax; parsing the rendering of a stream-free object
/// yields an equal value.
impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfObject::Null => write!(f, "null"),
            PdfObject::Boolean(b) => write!(f, "{b}"),
            PdfObject::Integer(i) => write!(f, "{i}"),
            PdfObject::Real(r) => {
                if r.fract() == 0.0 && r.is_finite() {
                    write!(f, "{r:.1}")
                } else {
                    write!(f, "{r}")
                }
            }
            PdfObject::String(s) => write!(f, "{s}"),
            PdfObject::Name(n) => write!(f, "{n}"),
            PdfObject::Array(a) => write!(f, "{a}"),
            PdfObject::Dictionary(d) => write!(f, "{d}"),
            PdfObject::Stream(s) => write!(f, "{} stream", s.dict),
            PdfObject::Reference(number, generation) => write!(f, "{number} {generation} R"),
        }
    }
}
