//! The attached session: structures read once at attach time and the
//! query surface served over them.

use crate::error::{ParseError, ParseResult};
use crate::header::PdfHeader;
use crate::objects::{PdfDictionary, PdfObject, PdfStream};
use crate::reader::PdfReader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Summary derived from the pages tree root: total page count and the
/// page rectangle's upper corner in default user-space units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSummary {
    pub page_count: i64,
    pub width: i64,
    pub height: i64,
}

/// An attached document session.
///
/// Attach resolves the info dictionary, the catalog root, and the pages
/// tree root, and derives the summary; those stay immutable for the
/// session's lifetime. Everything else is resolved on demand and owned by
/// the caller. Dropping the session releases the underlying handle.
pub struct PdfDocument<R: Read + Seek> {
    reader: PdfReader<R>,
    info: PdfDictionary,
    root: PdfDictionary,
    pages: PdfDictionary,
    summary: DocumentSummary,
}

impl PdfDocument<BufReader<File>> {
    /// Open a PDF file and attach to it.
    pub fn open<P: AsRef<Path>>(path: P) -> ParseResult<Self> {
        PdfReader::open(path).and_then(Self::new)
    }
}

impl<R: Read + Seek> PdfDocument<R> {
    /// Attach over a reader that has already located the xref.
    pub fn new(mut reader: PdfReader<R>) -> ParseResult<Self> {
        let info = {
            let (number, generation) = reader
                .trailer()
                .get(b"Info")
                .and_then(|o| o.as_reference())
                .ok_or_else(|| ParseError::MissingKey("Info".to_string()))?;
            reader
                .resolve_ref(number, generation)?
                .as_dict()
                .cloned()
                .ok_or_else(|| ParseError::MissingKey("Info".to_string()))?
        };

        let root = {
            let (number, generation) = reader
                .trailer()
                .get(b"Root")
                .and_then(|o| o.as_reference())
                .ok_or(ParseError::RootNotFound)?;
            reader
                .resolve_ref(number, generation)?
                .as_dict()
                .cloned()
                .ok_or(ParseError::RootNotFound)?
        };

        let pages = {
            let (number, generation) = root
                .get(b"Pages")
                .and_then(|o| o.as_reference())
                .ok_or(ParseError::PagesNotFound)?;
            reader
                .resolve_ref(number, generation)?
                .as_dict()
                .cloned()
                .ok_or(ParseError::PagesNotFound)?
        };

        let summary = Self::build_summary(&pages)?;

        Ok(Self {
            reader,
            info,
            root,
            pages,
            summary,
        })
    }

    fn build_summary(pages: &PdfDictionary) -> ParseResult<DocumentSummary> {
        let page_count = pages
            .get(b"Count")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| {
                ParseError::InvalidDocument("Count missing or not an integer".to_string())
            })?;
        if page_count < 0 {
            return Err(ParseError::InvalidDocument("negative page count".to_string()));
        }

        let media_box = pages
            .get(b"MediaBox")
            .and_then(|o| o.as_array())
            .ok_or_else(|| {
                ParseError::InvalidDocument("MediaBox missing or not an array".to_string())
            })?;
        if media_box.len() < 4 {
            return Err(ParseError::InvalidDocument(
                "MediaBox has fewer than 4 elements".to_string(),
            ));
        }

        let width = media_box.get(2).and_then(|o| o.as_integer()).ok_or_else(|| {
            ParseError::InvalidDocument("MediaBox width is not an integer".to_string())
        })?;
        let height = media_box.get(3).and_then(|o| o.as_integer()).ok_or_else(|| {
            ParseError::InvalidDocument("MediaBox height is not an integer".to_string())
        })?;

        Ok(DocumentSummary {
            page_count,
            width,
            height,
        })
    }

    pub fn summary(&self) -> &DocumentSummary {
        &self.summary
    }

    pub fn info(&self) -> &PdfDictionary {
        &self.info
    }

    pub fn header(&self) -> &PdfHeader {
        self.reader.header()
    }

    /// The document catalog.
    pub fn root(&self) -> &PdfDictionary {
        &self.root
    }

    /// The pages tree root.
    pub fn pages(&self) -> &PdfDictionary {
        &self.pages
    }

    /// All in-use references, ordered by object number then generation.
    pub fn references(&self) -> Vec<(u32, u32)> {
        self.reader.xref().in_use_references()
    }

    /// Resolve an indirect reference, chasing aliases.
    pub fn resolve(&mut self, number: u32, generation: u32) -> ParseResult<PdfObject> {
        self.reader.resolve_ref(number, generation)
    }

    /// Raw body bytes of a previously resolved stream.
    pub fn stream_data(&mut self, stream: &PdfStream) -> ParseResult<Vec<u8>> {
        self.reader.stream_data(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{PdfName, PdfString};
    use std::io::Cursor;

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

    fn standard_objects() -> Vec<(u32, &'static str)> {
        vec![
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (
                2,
                "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
            ),
            (3, "<< /Type /Page /Parent 2 0 R >>"),
            (4, "<< /Producer (pdfprobe) >>"),
        ]
    }

    fn attach(objects: &[(u32, &str)], trailer_extra: &str) -> ParseResult<PdfDocument<Cursor<Vec<u8>>>> {
        let pdf = build_pdf(objects, trailer_extra);
        PdfReader::new(Cursor::new(pdf)).and_then(PdfDocument::new)
    }

    #[test]
    fn test_attach_and_query() {
        let mut doc = attach(&standard_objects(), " /Root 1 0 R /Info 4 0 R").unwrap();

        assert_eq!(doc.header().version.major, 1);
        assert_eq!(doc.header().version.minor, 4);
        assert_eq!(
            *doc.summary(),
            DocumentSummary {
                page_count: 1,
                width: 612,
                height: 792,
            }
        );
        assert_eq!(
            doc.info().get(b"Producer"),
            Some(&PdfObject::String(PdfString(b"pdfprobe".to_vec())))
        );
        assert_eq!(
            doc.root().get(b"Type"),
            Some(&PdfObject::Name(PdfName::new("Catalog")))
        );
        assert_eq!(doc.pages().get(b"Count"), Some(&PdfObject::Integer(1)));
        assert_eq!(doc.references(), vec![(1, 0), (2, 0), (3, 0), (4, 0)]);

        let page = doc.resolve(3, 0).unwrap();
        assert_eq!(
            page.as_dict().unwrap().get(b"Parent"),
            Some(&PdfObject::Reference(2, 0))
        );
    }

    #[test]
    fn test_missing_root_fails() {
        let result = attach(&standard_objects(), " /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::RootNotFound)));
    }

    #[test]
    fn test_root_resolving_to_non_dict_fails() {
        let mut objects = standard_objects();
        objects.push((5, "42"));
        let result = attach(&objects, " /Root 5 0 R /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::RootNotFound)));
    }

    #[test]
    fn test_missing_info_fails() {
        let result = attach(&standard_objects(), " /Root 1 0 R");
        assert!(matches!(result, Err(ParseError::MissingKey(ref k)) if k == "Info"));
    }

    #[test]
    fn test_missing_pages_fails() {
        let objects = vec![
            (1, "<< /Type /Catalog >>"),
            (4, "<< /Producer (pdfprobe) >>"),
        ];
        let result = attach(&objects, " /Root 1 0 R /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::PagesNotFound)));
    }

    #[test]
    fn test_short_media_box_fails() {
        let objects = vec![
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Count 1 /MediaBox [0 0 612] >>"),
            (4, "<< /Producer (pdfprobe) >>"),
        ];
        let result = attach(&objects, " /Root 1 0 R /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::InvalidDocument(_))));
    }

    #[test]
    fn test_real_valued_media_box_fails() {
        let objects = vec![
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (
                2,
                "<< /Type /Pages /Count 1 /MediaBox [0 0 612.5 792] >>",
            ),
            (4, "<< /Producer (pdfprobe) >>"),
        ];
        let result = attach(&objects, " /Root 1 0 R /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::InvalidDocument(_))));
    }

    #[test]
    fn test_missing_count_fails() {
        let objects = vec![
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /MediaBox [0 0 612 792] >>"),
            (4, "<< /Producer (pdfprobe) >>"),
        ];
        let result = attach(&objects, " /Root 1 0 R /Info 4 0 R");
        assert!(matches!(result, Err(ParseError::InvalidDocument(_))));
    }
}
