//! Positioned text and bookmark records.

use unicode_normalization::UnicodeNormalization;

/// A run of text on one visual line sharing a single font size.
///
/// Positions are in PDF points with the origin at the top-left corner of the
/// page: `vertical_position` grows downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// The text content
    pub text: String,
    /// Effective font size in points
    pub font_size: f32,
    /// Whether the run is set predominantly in a bold face
    pub is_bold: bool,
    /// 0-based page index
    pub page_index: u32,
    /// Distance from the top of the page to the baseline
    pub vertical_position: f32,
    /// Distance from the left page edge
    pub horizontal_indent: f32,
}

impl TextRun {
    /// Create a new text run.
    pub fn new(
        text: impl Into<String>,
        font_size: f32,
        is_bold: bool,
        page_index: u32,
        vertical_position: f32,
        horizontal_indent: f32,
    ) -> Self {
        Self {
            text: text.into(),
            font_size,
            is_bold,
            page_index,
            vertical_position,
            horizontal_indent,
        }
    }
}

/// A bookmark (outline item) resolved to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEntry {
    /// Bookmark title, whitespace-normalized
    pub title: String,
    /// Nesting depth clamped to 1..=3
    pub level: u8,
    /// 0-based target page index
    pub target_page: u32,
}

impl BookmarkEntry {
    /// Create a new bookmark entry.
    pub fn new(title: impl Into<String>, level: u8, target_page: u32) -> Self {
        Self {
            title: title.into(),
            level,
            target_page,
        }
    }
}

/// NFC-normalize, trim and collapse internal whitespace to single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .split(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for deduplication: normalized and lower-cased.
pub fn normalize_key(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}
