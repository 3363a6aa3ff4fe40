//! Final outline assembly.

use std::collections::HashSet;

use crate::model::{BookmarkEntry, Heading, HeadingLevel};

/// Convert usable bookmarks into headings.
pub fn headings_from_bookmarks(entries: &[BookmarkEntry]) -> Vec<Heading> {
    entries
        .iter()
        .map(|entry| {
            Heading::new(
                HeadingLevel::from_depth(entry.level as usize),
                entry.title.clone(),
                entry.target_page,
            )
        })
        .collect()
}

/// Produce the final outline from headings given in document order.
///
/// Duplicates by (normalized text, page) keep their first occurrence; the
/// result is ordered by page (stable, so reading order is kept within a
/// page) and no heading sits more than one tier below its predecessor.
pub fn assemble(headings: Vec<Heading>) -> Vec<Heading> {
    let mut seen = HashSet::new();
    let mut outline: Vec<Heading> = headings
        .into_iter()
        .filter(|heading| seen.insert(heading.dedup_key()))
        .collect();

    outline.sort_by_key(|heading| heading.page);
    enforce_consistency(&mut outline);
    outline
}

/// Lift headings that skip a tier (H1 followed by H3) to one below their
/// predecessor. The first heading keeps its level.
pub fn enforce_consistency(outline: &mut [Heading]) {
    let mut previous: Option<HeadingLevel> = None;
    for heading in outline.iter_mut() {
        if let Some(prev) = previous {
            if heading.level.depth() > prev.depth() + 1 {
                heading.level = prev.deeper();
            }
        }
        previous = Some(heading.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HeadingLevel::{H1, H2, H3};

    fn h(level: HeadingLevel, text: &str, page: u32) -> Heading {
        Heading::new(level, text, page)
    }

    #[test]
    fn test_bookmarks_become_headings() {
        let entries = vec![
            BookmarkEntry::new("Intro", 1, 0),
            BookmarkEntry::new("Background", 2, 1),
            BookmarkEntry::new("Methods", 1, 3),
        ];
        let outline = assemble(headings_from_bookmarks(&entries));
        assert_eq!(
            outline,
            vec![h(H1, "Intro", 0), h(H2, "Background", 1), h(H1, "Methods", 3)]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let outline = assemble(vec![
            h(H1, "Overview", 1),
            h(H2, "overview", 1),
            h(H2, "Overview", 2),
        ]);
        assert_eq!(outline, vec![h(H1, "Overview", 1), h(H2, "Overview", 2)]);
    }

    #[test]
    fn test_stable_sort_by_page() {
        let outline = assemble(vec![
            h(H1, "Late", 5),
            h(H1, "First on two", 2),
            h(H2, "Second on two", 2),
        ]);
        let texts: Vec<&str> = outline.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["First on two", "Second on two", "Late"]);
    }

    #[test]
    fn test_consistency_lifts_skipped_tiers() {
        let outline = assemble(vec![
            h(H3, "Starts deep", 0),
            h(H1, "Top", 1),
            h(H3, "Jumped", 1),
            h(H3, "Sibling", 2),
            h(H2, "Back up", 3),
        ]);
        let levels: Vec<HeadingLevel> = outline.iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![H3, H1, H2, H3, H2]);
    }

    #[test]
    fn test_empty_outline() {
        assert!(assemble(Vec::new()).is_empty());
    }
}
