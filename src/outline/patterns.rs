//! Textual heading cues.

use regex::Regex;

use crate::error::{Error, Result};

/// Short function words that stay lower-case in title-cased headings.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "nor", "of", "on",
    "or", "per", "the", "to", "via", "vs", "with",
];

/// Textual cues found in one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cues {
    /// Depth of a section number (`1.` = 1, `1.2` = 2, `1.2.3` = 3)
    pub numbering_depth: Option<usize>,
    /// Short line written entirely in capitals
    pub all_caps: bool,
    /// Short line in title case
    pub title_case: bool,
}

impl Cues {
    /// Whether any cue fired.
    pub fn any(&self) -> bool {
        self.numbering_depth.is_some() || self.all_caps || self.title_case
    }
}

/// Compiled heading patterns.
#[derive(Debug, Clone)]
pub struct HeadingPatterns {
    dotted: Regex,
    lettered: Regex,
    roman: Regex,
    keyword: Regex,
    short_line_chars: usize,
}

impl HeadingPatterns {
    /// Compile the patterns; textual cues apply to lines of at most
    /// `short_line_chars` characters.
    pub fn new(short_line_chars: usize) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Other(format!("heading pattern: {}", e)))
        };
        Ok(Self {
            // 1. / 1.2 / 1.2.3 followed by text
            dotted: compile(r"^(\d{1,3}(?:\.\d{1,3}){0,5})\.?\)?\s+\S")?,
            // A. / B.2
            lettered: compile(r"^[A-Z](?:((?:\.\d{1,3}){1,4})\.?|\.)\s+\S")?,
            // IV.
            roman: compile(r"^[IVXLC]{1,6}\.\s+\S")?,
            // Chapter 3 / Section 2.1 / Appendix B
            keyword: compile(
                r"^(?i:chapter|part|section|appendix|annex)\s+(\d{1,3}(?:\.\d{1,3})*|[IVXLCivxlc]{1,6}\b|[A-Za-z]\b)",
            )?,
            short_line_chars,
        })
    }

    /// Numbering depth of a section-number prefix, if any.
    pub fn numbering_depth(&self, text: &str) -> Option<usize> {
        if let Some(caps) = self.dotted.captures(text) {
            return Some(components(&caps[1]));
        }
        if let Some(caps) = self.keyword.captures(text) {
            let number = &caps[1];
            return Some(if number.starts_with(|c: char| c.is_ascii_digit()) {
                components(number)
            } else {
                1
            });
        }
        if let Some(caps) = self.lettered.captures(text) {
            return Some(1 + caps.get(1).map_or(0, |m| m.as_str().matches('.').count()));
        }
        if self.roman.is_match(text) {
            return Some(1);
        }
        None
    }

    /// Short line with at least two letters, none lower-case.
    pub fn is_all_caps(&self, text: &str) -> bool {
        if text.chars().count() > self.short_line_chars {
            return false;
        }
        let upper = text.chars().filter(|c| c.is_uppercase()).count();
        upper >= 2 && !text.chars().any(char::is_lowercase)
    }

    /// Short line whose significant words start with a capital.
    pub fn is_title_case(&self, text: &str) -> bool {
        if text.chars().count() > self.short_line_chars || text.ends_with(['.', ',', ';']) {
            return false;
        }

        let words: Vec<&str> = text
            .split_whitespace()
            .filter(|w| w.starts_with(char::is_alphabetic))
            .collect();
        let Some(first) = words.first() else {
            return false;
        };
        if !first.starts_with(char::is_uppercase) {
            return false;
        }

        words.iter().skip(1).all(|word| {
            word.starts_with(char::is_uppercase)
                || MINOR_WORDS.contains(&word.to_lowercase().as_str())
        })
    }

    /// All cues for one candidate text.
    pub fn cues(&self, text: &str) -> Cues {
        Cues {
            numbering_depth: self.numbering_depth(text),
            all_caps: self.is_all_caps(text),
            title_case: self.is_title_case(text),
        }
    }
}

fn components(number: &str) -> usize {
    number.split('.').filter(|part| !part.is_empty()).count().max(1)
}
