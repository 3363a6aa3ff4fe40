//! Outline headings.

use serde::{Deserialize, Serialize};

use super::text::normalize_key;

/// One of the three heading tiers, H1 being the coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    #[serde(rename = "H1")]
    H1,
    #[serde(rename = "H2")]
    H2,
    #[serde(rename = "H3")]
    H3,
}

impl HeadingLevel {
    /// Map a nesting depth to a tier; 0 and 1 are H1, anything past 3 is H3.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            _ => HeadingLevel::H3,
        }
    }

    /// Nesting depth (1 for H1).
    pub fn depth(self) -> usize {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }

    /// The tier one level deeper, saturating at H3.
    pub fn deeper(self) -> Self {
        Self::from_depth(self.depth() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "H1",
            HeadingLevel::H2 => "H2",
            HeadingLevel::H3 => "H3",
        }
    }
}

impl std::fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outline entry.
///
/// Field order matches the serialized record: `level`, `text`, `page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Heading {
    /// Heading tier
    pub level: HeadingLevel,
    /// Heading text, whitespace-normalized
    pub text: String,
    /// 0-based page index
    pub page: u32,
}

impl Heading {
    /// Create a new heading.
    pub fn new(level: HeadingLevel, text: impl Into<String>, page: u32) -> Self {
        Self {
            level,
            text: text.into(),
            page,
        }
    }

    /// Deduplication key: (normalized text, page).
    pub fn dedup_key(&self) -> (String, u32) {
        (normalize_key(&self.text), self.page)
    }
}
