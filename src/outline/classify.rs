//! Heading classification from font sizes and textual cues.
//!
//! Classification is a pure function of the document's [`FontHistogram`], the
//! options and the candidate runs. Each heading's level is decided on its own;
//! level consistency across headings is the assembler's job.

use std::collections::{BTreeSet, HashMap};

use super::patterns::{Cues, HeadingPatterns};
use crate::model::{normalize_key, normalize_whitespace, Heading, HeadingLevel, TextRun};
use crate::parser::histogram::{key_size, size_key};
use crate::parser::{FontHistogram, OutlineOptions};

/// Number of size tiers (H1, H2, H3).
const MAX_TIERS: usize = 3;

/// Output of one classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Headings in order of appearance
    pub headings: Vec<Heading>,
    /// Size tier boundaries in points, largest first
    pub tiers: Vec<f32>,
    /// Candidates dropped as running headers or footers
    pub running_headers: usize,
}

/// Assigns H1/H2/H3 levels to candidate runs.
pub struct HeadingClassifier<'a> {
    histogram: &'a FontHistogram,
    options: &'a OutlineOptions,
    patterns: &'a HeadingPatterns,
}

/// A candidate that survived pre-filtering.
struct Candidate<'r> {
    run: &'r TextRun,
    text: String,
    key: i32,
}

impl<'a> HeadingClassifier<'a> {
    pub fn new(
        histogram: &'a FontHistogram,
        options: &'a OutlineOptions,
        patterns: &'a HeadingPatterns,
    ) -> Self {
        Self {
            histogram,
            options,
            patterns,
        }
    }

    /// Classify candidate runs given in document order.
    pub fn classify(&self, runs: &[TextRun]) -> Classification {
        let body_key = self.histogram.body_size().map(size_key);
        let candidates = self.prefilter(runs, body_key);
        let before = candidates.len();
        let candidates = self.drop_running_headers(candidates);
        let running_headers = before - candidates.len();

        let threshold = body_key.map(|body| key_size(body) + self.options.min_size_delta);
        let tiers = self.size_tiers(&candidates, threshold);
        log::debug!(
            "Size tiers {:?} (body {:?}), {} running header runs removed",
            tiers.iter().map(|k| key_size(*k)).collect::<Vec<_>>(),
            body_key.map(key_size),
            running_headers
        );

        let headings = candidates
            .into_iter()
            .filter_map(|c| {
                let cues = self.patterns.cues(&c.text);
                let level = self.level_for(&c, &cues, &tiers, threshold)?;
                Some(Heading::new(level, c.text, c.run.page_index))
            })
            .collect();

        Classification {
            headings,
            tiers: tiers.into_iter().map(key_size).collect(),
            running_headers,
        }
    }

    /// Drop empty, trivial, over-long and smaller-than-body candidates.
    fn prefilter<'r>(&self, runs: &'r [TextRun], body_key: Option<i32>) -> Vec<Candidate<'r>> {
        runs.iter()
            .filter_map(|run| {
                let text = normalize_whitespace(&run.text);
                let key = size_key(run.font_size);
                if text.is_empty()
                    || !text.chars().any(char::is_alphabetic)
                    || text.chars().count() > self.options.max_heading_chars
                    || body_key.is_some_and(|body| key < body)
                {
                    return None;
                }
                Some(Candidate { run, text, key })
            })
            .collect()
    }

    /// Remove candidates that repeat at the same height on many pages.
    ///
    /// Numbered headings are compared by their exact text, everything else
    /// by its shape, so `Chapter 2` never repeats `Chapter 1`.
    fn drop_running_headers<'r>(&self, candidates: Vec<Candidate<'r>>) -> Vec<Candidate<'r>> {
        let mut positions: HashMap<String, Vec<(u32, f32)>> = HashMap::new();
        let shapes: Vec<String> = candidates
            .iter()
            .map(|c| match self.patterns.numbering_depth(&c.text) {
                Some(_) => normalize_key(&c.text),
                None => shape_key(&c.text),
            })
            .collect();
        for (c, shape) in candidates.iter().zip(&shapes) {
            positions
                .entry(shape.clone())
                .or_default()
                .push((c.run.page_index, c.run.vertical_position));
        }

        let tolerance = self.options.running_header_tolerance;
        let min_pages = self.options.running_header_min_pages;

        candidates
            .into_iter()
            .zip(shapes)
            .filter(|(c, shape)| {
                let pages: BTreeSet<u32> = positions[shape]
                    .iter()
                    .filter(|(_, y)| (y - c.run.vertical_position).abs() <= tolerance)
                    .map(|(page, _)| *page)
                    .collect();
                pages.len() < min_pages
            })
            .map(|(c, _)| c)
            .collect()
    }

    /// Distinct size keys clearly above the body mode, largest first.
    fn size_tiers(&self, candidates: &[Candidate<'_>], threshold: Option<f32>) -> Vec<i32> {
        let Some(threshold) = threshold else {
            return Vec::new();
        };
        let sizes: BTreeSet<i32> = candidates
            .iter()
            .filter(|c| key_size(c.key) > threshold)
            .map(|c| c.key)
            .collect();
        sizes.into_iter().rev().take(MAX_TIERS).collect()
    }

    fn level_for(
        &self,
        candidate: &Candidate<'_>,
        cues: &Cues,
        tiers: &[i32],
        threshold: Option<f32>,
    ) -> Option<HeadingLevel> {
        let numbered = cues.numbering_depth.filter(|_| tiers.len() < MAX_TIERS);
        let is_large = threshold.is_some_and(|t| key_size(candidate.key) > t);

        let depth = if is_large {
            let tier = tiers
                .iter()
                .position(|t| candidate.key >= *t)
                .unwrap_or(MAX_TIERS - 1);
            numbered.unwrap_or(tier + 1)
        } else {
            // Body-sized text needs bold and a textual cue
            if !candidate.run.is_bold || !cues.any() {
                return None;
            }
            numbered.unwrap_or(tiers.len() + 1)
        };
        Some(HeadingLevel::from_depth(depth.clamp(1, MAX_TIERS)))
    }
}

/// Normalized text with digit runs replaced by `#`.
///
/// `Page 3 of 10` and `Page 4 of 10` share the key `page # of #`.
pub fn shape_key(text: &str) -> String {
    let mut key = String::new();
    let mut in_digits = false;
    for c in normalize_key(text).chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                key.push('#');
            }
            in_digits = true;
        } else {
            key.push(c);
            in_digits = false;
        }
    }
    key
}
