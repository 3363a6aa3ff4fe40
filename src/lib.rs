//! # pdfoutline
//!
//! Title and heading outline extraction from PDF documents.
//!
//! For each document this library produces a title and an ordered list of
//! H1/H2/H3 headings with their 0-based page numbers. Embedded bookmarks are
//! used when present; otherwise headings are inferred from font sizes, bold
//! text and numbering patterns.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfoutline::{extract_file, render};
//!
//! fn main() -> pdfoutline::Result<()> {
//!     let result = extract_file("document.pdf")?;
//!
//!     let json = render::to_json(&result, render::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bookmarks first**: a usable embedded outline is taken as-is
//! - **Font analysis**: body-size histogram and size tiers
//! - **Numbering cues**: `1.2.3`, `A.`, `IV.`, `Chapter 3`
//! - **Running header removal**: repeated page furniture is ignored
//! - **Batch processing**: whole directories on a Rayon pool

pub mod batch;
pub mod detect;
pub mod error;
pub mod model;
pub mod outline;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use batch::{BatchEvent, BatchOptions, BatchReport, FileOutcome};
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    BookmarkEntry, DocumentResult, ExtractionReport, Heading, HeadingLevel, Metadata,
    OutlineSource, TextRun, TitleSource,
};
pub use outline::{Extraction, OutlineExtractor};
pub use parser::{ErrorMode, LopdfBackend, OutlineOptions, PdfBackend};
pub use render::JsonFormat;

use std::path::Path;

/// Extract the title and outline from PDF bytes, surfacing every error.
///
/// # Arguments
///
/// * `data` - PDF file content
/// * `identifier` - Document name (usually the file stem)
/// * `options` - Extraction options
pub fn try_extract_bytes(
    data: &[u8],
    identifier: &str,
    options: &OutlineOptions,
) -> Result<Extraction> {
    check_size(data.len() as u64, options)?;
    let format = detect_format_from_bytes(data)?;
    log::debug!("{}: PDF {}", identifier, format.version);

    let backend = LopdfBackend::load_bytes(data)?;
    OutlineExtractor::new(options.clone())?.extract(&backend, identifier)
}

/// Extract the title and outline from PDF bytes.
///
/// A document that cannot be read yields an empty record; the reason is kept
/// in the report.
///
/// # Example
///
/// ```no_run
/// use pdfoutline::{extract_bytes_with_options, OutlineOptions};
///
/// let data = std::fs::read("report.pdf").unwrap();
/// let extraction = extract_bytes_with_options(&data, "report", &OutlineOptions::default());
/// println!("{:?} headings from {:?}", extraction.result.outline.len(), extraction.report.outline_source);
/// ```
pub fn extract_bytes_with_options(
    data: &[u8],
    identifier: &str,
    options: &OutlineOptions,
) -> Extraction {
    match try_extract_bytes(data, identifier, options) {
        Ok(extraction) => extraction,
        Err(e) => {
            log::warn!("{}: unreadable document: {}", identifier, e);
            Extraction::failed(&e)
        }
    }
}

/// Extract the title and outline from PDF bytes with default options.
///
/// # Example
///
/// ```no_run
/// use pdfoutline::extract_bytes;
///
/// let data = std::fs::read("report.pdf").unwrap();
/// let result = extract_bytes(&data, "report");
/// println!("{}", result.title);
/// ```
pub fn extract_bytes(data: &[u8], identifier: &str) -> DocumentResult {
    extract_bytes_with_options(data, identifier, &OutlineOptions::default()).result
}

/// Extract the title and outline of a PDF file.
///
/// Only I/O errors are returned; an unreadable PDF yields an empty record.
///
/// # Example
///
/// ```no_run
/// use pdfoutline::extract_file;
///
/// let result = extract_file("document.pdf").unwrap();
/// for heading in &result.outline {
///     println!("{} {} (page {})", heading.level, heading.text, heading.page);
/// }
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<DocumentResult> {
    Ok(extract_file_with_options(path, &OutlineOptions::default())?.result)
}

/// Extract a PDF file with custom options.
///
/// The size guard is checked against the file's metadata before reading.
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &OutlineOptions,
) -> Result<Extraction> {
    let path = path.as_ref();
    let identifier = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let size = std::fs::metadata(path)?.len();
    if let Err(e) = check_size(size, options) {
        log::warn!("{}: {}", path.display(), e);
        return Ok(Extraction::failed(&e));
    }

    let data = std::fs::read(path)?;
    Ok(extract_bytes_with_options(&data, &identifier, options))
}

fn check_size(size: u64, options: &OutlineOptions) -> Result<()> {
    let limit = options.max_file_bytes;
    if limit > 0 && size > limit {
        return Err(Error::FileTooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bytes_empty_data() {
        let extraction = extract_bytes_with_options(&[], "empty", &OutlineOptions::default());
        assert_eq!(extraction.result, DocumentResult::empty());
        assert!(extraction.report.failure.is_some());
    }

    #[test]
    fn test_try_extract_unknown_magic() {
        let data = b"<!DOCTYPE html><html></html>";
        let result = try_extract_bytes(data, "page", &OutlineOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_try_extract_truncated_pdf() {
        let data = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog";
        let result = try_extract_bytes(data, "broken", &OutlineOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_size_guard() {
        let options = OutlineOptions::default().with_max_file_bytes(8);
        let result = try_extract_bytes(b"%PDF-1.4\n%%EOF\n", "big", &options);
        assert!(matches!(
            result,
            Err(Error::FileTooLarge { size: 15, limit: 8 })
        ));
    }

    #[test]
    fn test_size_guard_disabled() {
        assert!(check_size(u64::MAX, &OutlineOptions::default().with_max_file_bytes(0)).is_ok());
    }

    #[test]
    fn test_extract_file_missing() {
        let result = extract_file("/nonexistent/definitely/missing.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_extract_bytes_garbage_is_empty_record() {
        let result = extract_bytes(b"Not a PDF file", "junk");
        assert_eq!(result.title, "");
        assert!(result.outline.is_empty());
    }
}
