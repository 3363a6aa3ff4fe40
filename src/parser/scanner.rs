//! Page feature scanning.
//!
//! Walks page content streams with a text-state machine and turns shown
//! strings into positioned, font-annotated text runs. Scanning happens in two
//! sequential passes over the document:
//!
//! 1. [`PageScanner::histogram_pass`] records every fragment's font size into a
//!    [`FontHistogram`] and keeps the merged runs of page 0 for title
//!    resolution.
//! 2. [`PageScanner::candidate_pass`] re-walks the pages and keeps only runs
//!    that can still be headings (anything but plain body text).
//!
//! A page that cannot be read is skipped and reported; in strict mode the
//! failure is returned instead.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, PageBox, PageId, PdfBackend, PdfValue,
};
use super::histogram::{key_size, size_key, FontHistogram};
use super::options::{ErrorMode, OutlineOptions};
use crate::error::{Error, Result};
use crate::model::{normalize_whitespace, TextRun};

/// Average glyph width relative to the font size when `/Widths` is missing.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// TJ adjustments beyond this (thousandths of text space) are word breaks.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Baseline tolerance for line grouping, relative to the font size.
const LINE_TOLERANCE_RATIO: f32 = 0.3;

/// Gap between fragments, relative to the average glyph width, that reads as
/// a space.
const SPACE_GAP_RATIO: f32 = 0.2;

/// A shown string with its device-space position and style.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Decoded text
    pub text: String,
    /// X of the string origin
    pub x: f32,
    /// Baseline Y (PDF user space, grows upwards)
    pub y: f32,
    /// Advance width of the whole string
    pub width: f32,
    /// Effective font size after text matrix and CTM scaling
    pub font_size: f32,
    /// Whether the font is bold
    pub is_bold: bool,
}

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[PdfValue]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n = operands[..6]
            .iter()
            .map(get_number_from_value)
            .collect::<Option<Vec<f32>>>()?;
        Some(Matrix {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }

    fn translation(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`
    fn multiply(&self, o: &Matrix) -> Matrix {
        Matrix {
            a: self.a * o.a + self.b * o.c,
            b: self.a * o.b + self.b * o.d,
            c: self.c * o.a + self.d * o.c,
            d: self.c * o.b + self.d * o.d,
            e: self.e * o.a + self.f * o.c + o.e,
            f: self.e * o.b + self.f * o.d + o.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// The parts of the graphics state that `q`/`Q` save and restore.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Interprets one page's content operations and collects text spans.
struct ContentWalker<'a> {
    fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    decode: &'a dyn Fn(&[u8], &[u8]) -> String,
    gs: GraphicsState,
    saved: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text: bool,
    spans: Vec<TextSpan>,
}

impl<'a> ContentWalker<'a> {
    fn new(
        fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
        decode: &'a dyn Fn(&[u8], &[u8]) -> String,
    ) -> Self {
        Self {
            fonts,
            decode,
            gs: GraphicsState::default(),
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text: false,
            spans: Vec::new(),
        }
    }

    fn number(op: &ContentOp, index: usize) -> Option<f32> {
        op.operands.get(index).and_then(get_number_from_value)
    }

    fn apply(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.saved.push(self.gs.clone()),
            "Q" => {
                if let Some(gs) = self.saved.pop() {
                    self.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.gs.ctm = m.multiply(&self.gs.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.gs.font = name.clone();
                }
                if let Some(size) = Self::number(op, 1) {
                    self.gs.font_size = size;
                }
            }
            "Tc" => self.gs.char_spacing = Self::number(op, 0).unwrap_or(0.0),
            "Tw" => self.gs.word_spacing = Self::number(op, 0).unwrap_or(0.0),
            "Tz" => self.gs.horizontal_scaling = Self::number(op, 0).unwrap_or(100.0) / 100.0,
            "TL" => self.gs.leading = Self::number(op, 0).unwrap_or(0.0),
            "Ts" => self.gs.rise = Self::number(op, 0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (Self::number(op, 0), Self::number(op, 1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (Self::number(op, 0), Self::number(op, 1)) {
                    self.gs.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.move_line(0.0, -self.gs.leading),
            "Tj" => {
                if let Some(s @ PdfValue::Str(_)) = op.operands.first() {
                    self.show(std::slice::from_ref(s));
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.move_line(0.0, -self.gs.leading);
                if let Some(s @ PdfValue::Str(_)) = op.operands.first() {
                    self.show(std::slice::from_ref(s));
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (Self::number(op, 0), Self::number(op, 1)) {
                    self.gs.word_spacing = aw;
                    self.gs.char_spacing = ac;
                }
                self.move_line(0.0, -self.gs.leading);
                if let Some(s @ PdfValue::Str(_)) = op.operands.get(2) {
                    self.show(std::slice::from_ref(s));
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).multiply(&self.text_matrix);
    }

    /// Horizontal advance of a shown string in unscaled text space.
    fn string_advance(&self, font: Option<&BackendFontInfo>, bytes: &[u8], decoded: &str) -> f32 {
        let gs = &self.gs;
        let fallback = APPROX_CHAR_WIDTH_RATIO * 1000.0;
        let mut total = 0.0;
        match font.filter(|f| !f.widths.is_empty()) {
            Some(font) => {
                for &code in bytes {
                    let w = font.glyph_width(code as u32).unwrap_or(fallback);
                    total += w / 1000.0 * gs.font_size + gs.char_spacing;
                    if code == b' ' {
                        total += gs.word_spacing;
                    }
                }
            }
            None => {
                for c in decoded.chars() {
                    total += fallback / 1000.0 * gs.font_size + gs.char_spacing;
                    if c == ' ' {
                        total += gs.word_spacing;
                    }
                }
            }
        }
        total * gs.horizontal_scaling
    }

    fn show(&mut self, items: &[PdfValue]) {
        if !self.in_text {
            return;
        }
        let fonts = self.fonts;
        let decode = self.decode;
        let font = fonts.get(&self.gs.font);
        let start = self.text_matrix;
        let mut text = String::new();

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = decode(&self.gs.font, bytes);
                    let advance = self.string_advance(font, bytes, &decoded);
                    text.push_str(&decoded);
                    self.advance(advance);
                }
                other => {
                    let Some(adjustment) = get_number_from_value(other) else {
                        continue;
                    };
                    if -adjustment > TJ_SPACE_THRESHOLD && wants_space_after(&text) {
                        text.push(' ');
                    }
                    self.advance(
                        -adjustment / 1000.0 * self.gs.font_size * self.gs.horizontal_scaling,
                    );
                }
            }
        }

        if text.trim().is_empty() {
            return;
        }

        let render = start.multiply(&self.gs.ctm);
        let (x, y) = render.apply(0.0, self.gs.rise);
        let (end_x, _) = self.text_matrix.multiply(&self.gs.ctm).apply(0.0, self.gs.rise);
        let font_size = self.gs.font_size.abs() * render.vertical_scale();
        if font_size <= 0.0 {
            return;
        }

        self.spans.push(TextSpan {
            text,
            x,
            y,
            width: (end_x - x).abs(),
            font_size,
            is_bold: font.is_some_and(|f| f.is_bold),
        });
    }
}

fn wants_space_after(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && c != '\u{00A0}' && !is_spaceless_script_char(c),
        None => false,
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

/// Decode one page into text spans.
pub fn extract_page_spans(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<TextSpan>> {
    let content = backend.page_content(page)?;
    if content.is_empty() {
        return Ok(Vec::new());
    }
    let ops = backend.decode_content(&content)?;

    let fonts: HashMap<Vec<u8>, BackendFontInfo> = match backend.page_fonts(page) {
        Ok(fonts) => fonts.into_iter().map(|f| (f.name.clone(), f)).collect(),
        Err(e) => {
            log::debug!("Page {:?} has unreadable font resources: {}", page, e);
            HashMap::new()
        }
    };
    let decoder = backend.text_decoder(page);

    let mut walker = ContentWalker::new(&fonts, &*decoder);
    for op in &ops {
        walker.apply(op);
    }
    Ok(walker.spans)
}

/// Split items already sorted by baseline into visual lines.
///
/// An item joins the current line when its baseline is within
/// `LINE_TOLERANCE_RATIO` x its font size of the line's first baseline.
pub fn split_lines<T>(
    items: impl IntoIterator<Item = T>,
    baseline: impl Fn(&T) -> f32,
    font_size: impl Fn(&T) -> f32,
) -> Vec<Vec<T>> {
    let mut lines: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut current_y: Option<f32> = None;

    for item in items {
        let y = baseline(&item);
        let tolerance = font_size(&item) * LINE_TOLERANCE_RATIO;
        match current_y {
            Some(line_y) if (y - line_y).abs() <= tolerance => current.push(item),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(y);
                current.push(item);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Group spans into visual lines, top to bottom; each line sorted left to
/// right.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<Vec<TextSpan>> {
    // PDF Y grows upwards: sort by Y descending, then X
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = split_lines(spans, |span| span.y, |span| span.font_size);
    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

/// Join spans of one line, inserting spaces on horizontal gaps.
fn join_spans(spans: &[TextSpan]) -> String {
    let mut result = String::new();

    for (i, span) in spans.iter().enumerate() {
        if i == 0 {
            result.push_str(&span.text);
            continue;
        }
        let prev = &spans[i - 1];
        let gap = span.x - (prev.x + prev.width);

        let char_count = span.text.chars().count();
        let avg_char_width = if char_count > 0 && span.width > 0.0 {
            span.width / char_count as f32
        } else {
            span.font_size * APPROX_CHAR_WIDTH_RATIO
        };

        let both_spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
            && span.text.chars().next().is_some_and(is_spaceless_script_char);
        let has_space = prev.text.ends_with([' ', '\u{00A0}'])
            || span.text.starts_with([' ', '\u{00A0}']);

        if gap > avg_char_width * SPACE_GAP_RATIO && !both_spaceless && !has_space {
            result.push(' ');
        }
        result.push_str(&span.text);
    }

    result
}

/// Merge adjacent same-size spans of one line into text runs.
pub fn merge_line_into_runs(line: &[TextSpan], page_index: u32, page_box: &PageBox) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut start = 0;

    while start < line.len() {
        let key = size_key(line[start].font_size);
        let end = line[start..]
            .iter()
            .position(|s| size_key(s.font_size) != key)
            .map_or(line.len(), |offset| start + offset);
        let group = &line[start..end];

        let text = normalize_whitespace(&join_spans(group));
        if !text.is_empty() {
            let total: usize = group.iter().map(|s| s.text.chars().count()).sum();
            let bold: usize = group
                .iter()
                .filter(|s| s.is_bold)
                .map(|s| s.text.chars().count())
                .sum();
            let first = &group[0];
            runs.push(TextRun::new(
                text,
                key_size(key),
                total > 0 && bold * 2 > total,
                page_index,
                page_box.top - first.y,
                first.x - page_box.left,
            ));
        }
        start = end;
    }

    runs
}

/// Turn one page's spans into runs in reading order.
pub fn runs_from_spans(spans: Vec<TextSpan>, page_index: u32, page_box: &PageBox) -> Vec<TextRun> {
    group_spans_into_lines(spans)
        .iter()
        .flat_map(|line| merge_line_into_runs(line, page_index, page_box))
        .collect()
}

/// Result of the histogram pass.
#[derive(Debug, Clone, Default)]
pub struct HistogramPass {
    /// Character-weighted font sizes of all readable pages
    pub histogram: FontHistogram,
    /// Merged runs of page 0, in reading order
    pub first_page_runs: Vec<TextRun>,
    /// Pages that could not be parsed
    pub skipped_pages: Vec<u32>,
    /// Whether the time budget ran out before the last page
    pub timed_out: bool,
}

/// Result of the candidate pass.
#[derive(Debug, Clone, Default)]
pub struct CandidatePass {
    /// Runs that are not plain body text, in document order
    pub candidates: Vec<TextRun>,
    /// Pages that could not be parsed
    pub skipped_pages: Vec<u32>,
    /// Whether the time budget ran out before the last page
    pub timed_out: bool,
}

/// Sequential two-pass scanner over one document.
pub struct PageScanner<'a> {
    backend: &'a dyn PdfBackend,
    options: &'a OutlineOptions,
    deadline: Option<Instant>,
}

impl<'a> PageScanner<'a> {
    /// Create a scanner whose time budget starts now.
    pub fn new(backend: &'a dyn PdfBackend, options: &'a OutlineOptions) -> Self {
        let deadline = options
            .time_budget
            .and_then(|budget| Instant::now().checked_add(budget));
        Self {
            backend,
            options,
            deadline,
        }
    }

    #[cfg(test)]
    fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Decode page `index` into runs.
    pub fn scan_page(&self, index: u32) -> Result<Vec<TextRun>> {
        let page = self.page_id(index)?;
        let spans = extract_page_spans(self.backend, page)?;
        Ok(runs_from_spans(spans, index, &self.backend.page_box(page)))
    }

    fn page_id(&self, index: u32) -> Result<PageId> {
        self.backend
            .pages()
            .get(index as usize)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.backend.page_count()))
    }

    /// Record a page failure; fatal only in strict mode.
    fn page_failed(&self, index: u32, err: Error, skipped: &mut Vec<u32>) -> Result<()> {
        if self.options.error_mode == ErrorMode::Strict {
            return Err(match err {
                e @ Error::InvalidContent { .. } => e,
                e => Error::InvalidContent {
                    page: index,
                    reason: e.to_string(),
                },
            });
        }
        log::warn!("Skipping page {}: {}", index, err);
        skipped.push(index);
        Ok(())
    }

    /// Pass 1: build the font histogram and keep page 0's runs.
    pub fn histogram_pass(&self) -> Result<HistogramPass> {
        let mut pass = HistogramPass::default();

        for index in 0..self.backend.page_count() {
            if self.out_of_time() {
                log::warn!("Time budget exceeded in histogram pass at page {}", index);
                pass.timed_out = true;
                break;
            }

            let spans = match self
                .page_id(index)
                .and_then(|page| extract_page_spans(self.backend, page))
            {
                Ok(spans) => spans,
                Err(e) => {
                    self.page_failed(index, e, &mut pass.skipped_pages)?;
                    continue;
                }
            };

            for span in &spans {
                pass.histogram.add_text(span.font_size, &span.text);
            }
            if index == 0 {
                let page_box = self.backend.page_box(self.page_id(0)?);
                pass.first_page_runs = runs_from_spans(spans, 0, &page_box);
            }
        }

        log::debug!(
            "Histogram pass: {} pages, {} skipped, body size {:?}",
            self.backend.page_count(),
            pass.skipped_pages.len(),
            pass.histogram.body_size()
        );
        Ok(pass)
    }

    /// Pass 2: collect runs that are not plain body text.
    ///
    /// Pages listed in `known_bad` already failed in pass 1 and are not
    /// retried.
    pub fn candidate_pass(&self, histogram: &FontHistogram, known_bad: &[u32]) -> Result<CandidatePass> {
        let known_bad: BTreeSet<u32> = known_bad.iter().copied().collect();
        let mut pass = CandidatePass::default();

        for index in 0..self.backend.page_count() {
            if known_bad.contains(&index) {
                continue;
            }
            if self.out_of_time() {
                log::warn!("Time budget exceeded in candidate pass at page {}", index);
                pass.timed_out = true;
                break;
            }

            match self.scan_page(index) {
                Ok(runs) => pass.candidates.extend(
                    runs.into_iter()
                        .filter(|run| run.is_bold || !histogram.is_body_size(run.font_size)),
                ),
                Err(e) => self.page_failed(index, e, &mut pass.skipped_pages)?,
            }
        }

        log::debug!("Candidate pass: {} candidate runs", pass.candidates.len());
        Ok(pass)
    }
}
