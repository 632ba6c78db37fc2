//! # pdfprobe
//!
//! A random-access reader for the structure of PDF files: the header, the
//! classical cross-reference table, the trailer, and the object graph
//! reachable through indirect references.
//!
//! The crate reads, it never writes. Stream bodies are located but not
//! decoded; cross-reference streams, object streams, and encrypted files
//! are out of scope.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pdfprobe::PdfDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = PdfDocument::open("document.pdf")?;
//!
//! let summary = doc.summary();
//! println!("{} pages, {} x {}", summary.page_count, summary.width, summary.height);
//!
//! for (number, generation) in doc.references() {
//!     let object = doc.resolve(number, generation)?;
//!     println!("{number} {generation} obj: {object}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod objects;
pub mod reader;
pub mod tape;
pub mod xref;

pub use self::document::{DocumentSummary, PdfDocument};
pub use self::error::{ParseError, ParseResult};
pub use self::filters::Filter;
pub use self::header::{PdfHeader, PdfVersion};
pub use self::objects::{
    PdfArray, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString,
};
pub use self::reader::PdfReader;
pub use self::tape::{Direction, Tape};
pub use self::xref::{EntryStatus, XRefEntry, XRefTable};
