//! Document-level types.

use serde::{Deserialize, Serialize};

use super::Heading;
use crate::error::{Error, Result};

/// The per-document output record: `{"title": ..., "outline": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentResult {
    /// Document title (may be empty)
    pub title: String,
    /// Ordered outline
    pub outline: Vec<Heading>,
}

impl DocumentResult {
    /// Create a new result.
    pub fn new(title: impl Into<String>, outline: Vec<Heading>) -> Self {
        Self {
            title: title.into(),
            outline,
        }
    }

    /// The record produced for a document that could not be read at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a serialized record, rejecting anything outside the output schema.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Schema(e.to_string()))
    }
}

/// Document information dictionary fields we care about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Raw `/Title` entry
    pub title: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: u32,

    /// Whether the document is encrypted
    pub encrypted: bool,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// Where the outline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlineSource {
    /// Embedded bookmarks
    Bookmarks,
    /// Font and pattern analysis of page content
    Content,
    /// Nothing was extracted
    #[default]
    None,
}

/// Which step of the title fallback chain produced the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleSource {
    /// Info dictionary `/Title`
    Metadata,
    /// Largest text on the first page
    LargestFont,
    /// First meaningful line of the first page
    FirstLine,
    /// No title found
    #[default]
    None,
}

/// Diagnostics gathered while processing one document.
///
/// Never serialized into the output record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    /// Number of pages in the document
    pub page_count: u32,
    /// Outline provenance
    pub outline_source: OutlineSource,
    /// Title provenance
    pub title_source: TitleSource,
    /// Usable bookmark entries found
    pub bookmark_count: usize,
    /// Body-text mode, if any text was seen
    pub body_size: Option<f32>,
    /// Heading-tier sizes, largest first
    pub heading_sizes: Vec<f32>,
    /// 0-based indices of pages that could not be parsed
    pub skipped_pages: Vec<u32>,
    /// Whether the soft time budget ran out
    pub timed_out: bool,
    /// Document-level failure, if the document could not be read
    pub failure: Option<String>,
}

impl ExtractionReport {
    /// Whether the document was processed without any recorded problem.
    pub fn is_clean(&self) -> bool {
        self.failure.is_none() && self.skipped_pages.is_empty() && !self.timed_out
    }
}
