//! Document-wide font size histogram.

use std::collections::BTreeMap;

/// Round a font size to a histogram key (tenths of a point).
pub fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Convert a histogram key back to points.
pub fn key_size(key: i32) -> f32 {
    key as f32 / 10.0
}

/// Character-weighted font size histogram for one document.
///
/// Built once during the first scanning pass and read-only afterwards.
/// Weighting by character count keeps a handful of large headings from
/// shifting the body-text mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontHistogram {
    counts: BTreeMap<i32, usize>,
}

impl FontHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a font size observation with an explicit weight.
    pub fn add(&mut self, size: f32, weight: usize) {
        if !(size > 0.0) || weight == 0 {
            return;
        }
        *self.counts.entry(size_key(size)).or_insert(0) += weight;
    }

    /// Add a text fragment, weighted by its visible character count.
    pub fn add_text(&mut self, size: f32, text: &str) {
        let weight = text.chars().filter(|c| !c.is_whitespace()).count();
        self.add(size, weight);
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The body-text mode. Ties resolve to the smaller size.
    pub fn body_size(&self) -> Option<f32> {
        self.counts
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(key, _)| key_size(*key))
    }

    /// Whether `size` rounds to the body-text mode.
    pub fn is_body_size(&self, size: f32) -> bool {
        self.body_size()
            .is_some_and(|body| size_key(body) == size_key(size))
    }
}
