//! Document title resolution.
//!
//! The title comes from the first source that yields something usable:
//! the Info dictionary `/Title`, the largest text on page 0, then the first
//! meaningful line of page 0.

use std::collections::BTreeSet;

use crate::model::{normalize_key, normalize_whitespace, TextRun, TitleSource};
use crate::parser::histogram::size_key;
use crate::parser::scanner::split_lines;
use crate::parser::OutlineOptions;

/// Metadata titles that say nothing about the document.
const PLACEHOLDER_TITLES: &[&str] = &[
    "untitled",
    "untitled document",
    "document",
    "title",
    "no title",
    "slide 1",
    "(anonymous)",
];

/// Authoring-tool file extensions that leak into `/Title`.
const FILE_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".indd", ".rtf", ".txt", ".odt",
    ".tex",
];

/// Prefixes Office printer drivers put in front of the file name.
const TOOL_PREFIXES: &[&str] = &["microsoft word - ", "microsoft powerpoint - "];

/// A resolved title and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub text: String,
    pub source: TitleSource,
}

/// Run the fallback chain.
///
/// `identifier` is the document's file stem; a metadata title equal to it is
/// a placeholder.
pub fn resolve_title(
    metadata_title: Option<&str>,
    identifier: &str,
    first_page_runs: &[TextRun],
    options: &OutlineOptions,
) -> ResolvedTitle {
    if let Some(text) = metadata_title.and_then(|raw| usable_metadata_title(raw, identifier)) {
        return ResolvedTitle {
            text,
            source: TitleSource::Metadata,
        };
    }
    if let Some(text) = largest_font_title(
        first_page_runs,
        options.min_title_chars,
        options.max_title_chars,
    ) {
        return ResolvedTitle {
            text,
            source: TitleSource::LargestFont,
        };
    }
    if let Some(text) = first_line_title(first_page_runs, options.min_title_chars) {
        return ResolvedTitle {
            text,
            source: TitleSource::FirstLine,
        };
    }
    ResolvedTitle {
        text: String::new(),
        source: TitleSource::None,
    }
}

/// Normalized metadata title, unless empty or a placeholder.
pub fn usable_metadata_title(raw: &str, identifier: &str) -> Option<String> {
    let title = normalize_whitespace(raw);
    if title.is_empty() || is_placeholder(&title, identifier) {
        log::debug!("Ignoring metadata title {:?}", raw);
        return None;
    }
    Some(title)
}

/// Whether a metadata title is generic or just the file name.
pub fn is_placeholder(title: &str, identifier: &str) -> bool {
    let key = normalize_key(title);
    if PLACEHOLDER_TITLES.contains(&key.as_str()) {
        return true;
    }
    if FILE_EXTENSIONS.iter().any(|ext| key.ends_with(ext)) {
        return true;
    }
    if TOOL_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
        return true;
    }

    let stem = normalize_key(identifier);
    if stem.is_empty() {
        return false;
    }
    let spaced_stem = normalize_key(&identifier.replace(['_', '-'], " "));
    key == stem || key == spaced_stem
}

/// The page-0 runs set in the largest size, joined top to bottom.
///
/// A size whose text is shorter than `min_chars` or has no letter, such as a
/// drop cap or a page number, gives way to the next smaller size.
pub fn largest_font_title(
    runs: &[TextRun],
    min_chars: usize,
    max_chars: usize,
) -> Option<String> {
    let eligible: Vec<&TextRun> = runs
        .iter()
        .filter(|run| run.text.chars().any(char::is_alphanumeric))
        .collect();
    let sizes: BTreeSet<i32> = eligible.iter().map(|run| size_key(run.font_size)).collect();

    for key in sizes.into_iter().rev() {
        let mut largest: Vec<&TextRun> = eligible
            .iter()
            .copied()
            .filter(|run| size_key(run.font_size) == key)
            .collect();
        largest.sort_by(|a, b| {
            a.vertical_position
                .total_cmp(&b.vertical_position)
                .then(a.horizontal_indent.total_cmp(&b.horizontal_indent))
        });

        let title = normalize_whitespace(
            &largest
                .iter()
                .map(|run| run.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        if is_trivial(&title, min_chars) {
            log::debug!("Skipping trivial largest-font text {:?}", title);
            continue;
        }
        if title.chars().count() > max_chars {
            break;
        }
        return Some(title);
    }

    log::debug!("No distinguishable largest-font title on page 0");
    None
}

/// Too short, or without a single letter.
fn is_trivial(text: &str, min_chars: usize) -> bool {
    text.chars().count() < min_chars || !text.chars().any(char::is_alphabetic)
}

/// First page-0 line with at least `min_chars` characters and a letter.
pub fn first_line_title(runs: &[TextRun], min_chars: usize) -> Option<String> {
    page_lines(runs)
        .into_iter()
        .find(|line| !is_trivial(line, min_chars))
}

/// Rebuild visual lines from runs, top to bottom.
fn page_lines(runs: &[TextRun]) -> Vec<String> {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| a.vertical_position.total_cmp(&b.vertical_position));

    split_lines(sorted, |run| run.vertical_position, |run| run.font_size)
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.horizontal_indent.total_cmp(&b.horizontal_indent));
            let parts: Vec<&str> = line.iter().map(|run| run.text.as_str()).collect();
            normalize_whitespace(&parts.join(" "))
        })
        .filter(|line| !line.is_empty())
        .collect()
}
