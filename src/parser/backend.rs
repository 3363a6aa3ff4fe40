//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the two capabilities the outline
//! engine needs (document structure/metadata, and positioned text with font
//! attributes), isolating the concrete PDF library (lopdf) from the scanning
//! and classification logic.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::Metadata;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Decodes a shown string with the named font resource of one page.
///
/// Arguments are the font resource name and the raw string bytes.
pub type TextDecoder<'a> = Box<dyn Fn(&[u8], &[u8]) -> String + 'a>;

/// Font information returned by the backend.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// Bold according to the font name or descriptor.
    pub is_bold: bool,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph widths in thousandths of text space, from `/Widths`.
    pub widths: Vec<f32>,
}

impl BackendFontInfo {
    /// Glyph width (thousandths of text space) for a single-byte code.
    pub fn glyph_width(&self, code: u32) -> Option<f32> {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
    }
}

/// A page's visible area in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no usable MediaBox.
    pub const LETTER: PageBox = PageBox {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// A bookmark as stored in the document, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutlineItem {
    /// Decoded `/Title` (not normalized).
    pub title: String,
    /// Nesting depth, 1 for top-level items.
    pub depth: usize,
    /// Resolved 0-based destination page, if it could be resolved.
    pub target_page: Option<u32>,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font info, content stream
/// decoding, text decoding, metadata and the bookmark tree, without exposing
/// any concrete PDF library types.
pub trait PdfBackend {
    /// Pages in document order; the position is the 0-based page index.
    fn pages(&self) -> &[PageId];

    /// The page's MediaBox (inherited from ancestors when absent).
    fn page_box(&self, page: PageId) -> PageBox;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Build a text decoder for the fonts of one page.
    ///
    /// Encodings are resolved once per page so that every shown string does
    /// not re-read font dictionaries.
    fn text_decoder<'a>(&'a self, page: PageId) -> TextDecoder<'a>;

    /// Document information dictionary.
    fn metadata(&self) -> Metadata;

    /// The bookmark tree flattened in pre-order.
    fn outline_items(&self) -> Result<Vec<RawOutlineItem>>;

    /// Number of pages.
    fn page_count(&self) -> u32 {
        self.pages().len() as u32
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM marker
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    // UTF-8 with BOM marker (PDF 2.0 text strings)
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend — concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    pages: Vec<PageId>,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn stream_content(&self, obj: &Object) -> Result<Vec<u8>> {
        match resolve(&self.doc, obj) {
            Some(Object::Stream(s)) if s.dict.get(b"Filter").is_ok() => s
                .decompressed_content()
                .map_err(|e| Error::PdfParse(e.to_string())),
            Some(Object::Stream(s)) => Ok(s.content.clone()),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> &[PageId] {
        &self.pages
    }

    fn page_box(&self, page: PageId) -> PageBox {
        let mut current = self.doc.get_dictionary(page).ok();
        // Inherited attributes live on Pages nodes; cap the walk for cyclic trees.
        for _ in 0..32 {
            let Some(dict) = current else { break };
            if let Some(media_box) = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|o| resolve(&self.doc, o))
                .and_then(|o| o.as_array().ok())
            {
                let nums: Vec<f32> = media_box
                    .iter()
                    .filter_map(|o| resolve(&self.doc, o))
                    .filter_map(|o| o.as_float().ok())
                    .collect();
                if nums.len() == 4 {
                    let page_box = PageBox {
                        left: nums[0].min(nums[2]),
                        bottom: nums[1].min(nums[3]),
                        right: nums[0].max(nums[2]),
                        top: nums[1].max(nums[3]),
                    };
                    if page_box.width() > 0.0 && page_box.height() > 0.0 {
                        return page_box;
                    }
                }
            }
            current = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| p.as_reference().ok())
                .and_then(|id| self.doc.get_dictionary(id).ok());
        }
        PageBox::LETTER
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(lopdf_fonts
            .iter()
            .map(|(name, font_dict)| font_info(&self.doc, name, font_dict))
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        // A page without /Contents is blank, not broken.
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        match resolve(&self.doc, contents) {
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                let mut failures = 0;
                for obj in arr {
                    match self.stream_content(obj) {
                        Ok(data) => {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                        Err(e) => {
                            failures += 1;
                            log::debug!("Skipping content stream part: {}", e);
                        }
                    }
                }
                if failures > 0 && failures == arr.len() {
                    return Err(Error::PdfParse("No readable content stream".to_string()));
                }
                Ok(content)
            }
            Some(obj @ Object::Stream(_)) => self.stream_content(obj),
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn text_decoder<'a>(&'a self, page: PageId) -> TextDecoder<'a> {
        let doc = &self.doc;
        let fonts = doc.get_page_fonts(page).unwrap_or_default();
        let encodings: BTreeMap<Vec<u8>, _> = fonts
            .into_iter()
            // lopdf only reads encodings of dictionaries typed /Font
            .filter(|(_, dict)| dict.type_is(b"Font"))
            .filter_map(|(name, dict)| dict.get_font_encoding(doc).ok().map(|enc| (name, enc)))
            .collect();

        Box::new(move |font_name: &[u8], bytes: &[u8]| {
            encodings
                .get(font_name)
                .and_then(|enc| LopdfDocument::decode_text(enc, bytes).ok())
                .unwrap_or_else(|| decode_text_simple(bytes))
        })
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.version());
        metadata.page_count = self.page_count();
        metadata.encrypted = self.doc.is_encrypted();

        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_dict().ok());

        if let Some(info_dict) = info {
            metadata.title = get_string_from_dict(&self.doc, info_dict, b"Title");
            metadata.producer = get_string_from_dict(&self.doc, info_dict, b"Producer");
        }

        metadata
    }

    fn outline_items(&self) -> Result<Vec<RawOutlineItem>> {
        super::bookmarks::read_outline_tree(&self.doc, &self.pages)
    }
}

/// Follow a reference to its target; direct objects are returned as-is.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Decode a PDF text string (UTF-16BE, UTF-8 with BOM, or PDFDocEncoding).
pub(crate) fn decode_pdf_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(
    doc: &LopdfDocument,
    dict: &lopdf::Dictionary,
    key: &[u8],
) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(decode_pdf_string)
}

fn font_info(doc: &LopdfDocument, name: &[u8], font: &lopdf::Dictionary) -> BackendFontInfo {
    let base_font = font
        .get(b"BaseFont")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let first_char = font
        .get(b"FirstChar")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0)
        .max(0) as u32;

    let widths = font
        .get(b"Widths")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|w| {
                    resolve(doc, w)
                        .and_then(|w| w.as_float().ok())
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .unwrap_or_default();

    let descriptor_bold = font
        .get(b"FontDescriptor")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .map(|desc| {
            let weight = desc
                .get(b"FontWeight")
                .ok()
                .and_then(|o| o.as_float().ok())
                .unwrap_or(0.0);
            let flags = desc
                .get(b"Flags")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0);
            weight >= 600.0 || flags & FORCE_BOLD_FLAG != 0
        })
        .unwrap_or(false);

    BackendFontInfo {
        name: name.to_vec(),
        is_bold: descriptor_bold || is_bold_font_name(&base_font),
        base_font,
        first_char,
        widths,
    }
}

/// Font descriptor flag bit 19 (ForceBold).
const FORCE_BOLD_FLAG: i64 = 1 << 18;

/// Whether a base font name denotes a bold face ("ABCDEF+Arial-BoldMT").
pub fn is_bold_font_name(base_font: &str) -> bool {
    let lower = base_font.to_lowercase();
    ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        // 0xE9 = 'é' in Latin-1
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_decode_text_simple_utf8_bom() {
        let bytes = vec![0xEF, 0xBB, 0xBF, b'O', b'k'];
        assert_eq!(decode_text_simple(&bytes), "Ok");
    }

    #[test]
    fn test_get_number_from_value() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Other), None);
    }

    #[test]
    fn test_bold_font_names() {
        assert!(is_bold_font_name("Helvetica-Bold"));
        assert!(is_bold_font_name("ABCDEF+Arial-BoldMT"));
        assert!(is_bold_font_name("Roboto-Black"));
        assert!(is_bold_font_name("SourceSansPro-Semibold"));
        assert!(!is_bold_font_name("Helvetica-Oblique"));
        assert!(!is_bold_font_name("TimesNewRomanPSMT"));
    }

    #[test]
    fn test_glyph_width_lookup() {
        let font = BackendFontInfo {
            first_char: 32,
            widths: vec![278.0, 0.0, 355.0],
            ..Default::default()
        };
        assert_eq!(font.glyph_width(32), Some(278.0));
        assert_eq!(font.glyph_width(33), None);
        assert_eq!(font.glyph_width(34), Some(355.0));
        assert_eq!(font.glyph_width(10), None);
        assert_eq!(font.glyph_width(99), None);
    }

    #[test]
    fn test_page_box_dimensions() {
        assert_eq!(PageBox::LETTER.width(), 612.0);
        assert_eq!(PageBox::LETTER.height(), 792.0);
    }

    #[test]
    fn test_load_bytes_rejects_garbage() {
        assert!(LopdfBackend::load_bytes(b"%PDF-1.4\nthis is not a pdf").is_err());
    }
}
