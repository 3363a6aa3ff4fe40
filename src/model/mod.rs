//! Data model shared by the scanner, the classifier and the output sink.
//!
//! Every value here is scoped to one document's processing; nothing is
//! cached across documents.

mod document;
mod heading;
mod text;

pub use document::{DocumentResult, ExtractionReport, Metadata, OutlineSource, TitleSource};
pub use heading::{Heading, HeadingLevel};
pub use text::{normalize_key, normalize_whitespace, BookmarkEntry, TextRun};
