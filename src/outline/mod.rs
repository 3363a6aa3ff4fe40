//! Outline extraction pipeline.
//!
//! One document goes through these steps in order:
//!
//! 1. embedded bookmarks are read and checked for plausibility
//! 2. pass 1 builds the font histogram and keeps page 0's runs
//! 3. the title is resolved
//! 4. if the bookmarks are unusable, pass 2 collects candidate runs and the
//!    classifier turns them into headings
//! 5. the assembler deduplicates, orders and levels the outline
//!
//! All state lives in [`OutlineExtractor::extract`]'s stack frame; nothing
//! leaks from one document into the next.

pub mod assemble;
pub mod classify;
pub mod patterns;
pub mod title;

pub use assemble::{assemble, enforce_consistency, headings_from_bookmarks};
pub use classify::{Classification, HeadingClassifier};
pub use patterns::{Cues, HeadingPatterns};
pub use title::{resolve_title, ResolvedTitle};

use crate::error::{Error, Result};
use crate::model::{DocumentResult, ExtractionReport, OutlineSource};
use crate::parser::{extract_bookmarks, is_plausible, OutlineOptions, PageScanner, PdfBackend};

/// A document's output record together with its diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// The serialized part
    pub result: DocumentResult,
    /// What happened while producing it
    pub report: ExtractionReport,
}

impl Extraction {
    /// The empty record for a document that could not be read.
    pub fn failed(err: &Error) -> Self {
        Self {
            result: DocumentResult::empty(),
            report: ExtractionReport {
                failure: Some(err.to_string()),
                ..Default::default()
            },
        }
    }
}

/// Runs the extraction pipeline with fixed options.
#[derive(Debug, Clone)]
pub struct OutlineExtractor {
    options: OutlineOptions,
    patterns: HeadingPatterns,
}

impl OutlineExtractor {
    /// Create an extractor.
    pub fn new(options: OutlineOptions) -> Result<Self> {
        let patterns = HeadingPatterns::new(options.short_line_chars)?;
        Ok(Self { options, patterns })
    }

    /// The options this extractor runs with.
    pub fn options(&self) -> &OutlineOptions {
        &self.options
    }

    /// Extract the title and outline of one document.
    ///
    /// `identifier` is the document's file stem. Page failures are skipped
    /// unless the options ask for strict mode.
    pub fn extract(&self, backend: &dyn PdfBackend, identifier: &str) -> Result<Extraction> {
        let metadata = backend.metadata();
        let mut report = ExtractionReport {
            page_count: backend.page_count(),
            ..Default::default()
        };

        let bookmarks = extract_bookmarks(backend);
        report.bookmark_count = bookmarks.len();
        let use_bookmarks = is_plausible(&bookmarks);

        let scanner = PageScanner::new(backend, &self.options);
        let pass1 = scanner.histogram_pass()?;
        report.body_size = pass1.histogram.body_size();
        report.skipped_pages = pass1.skipped_pages.clone();
        report.timed_out = pass1.timed_out;

        let title = resolve_title(
            metadata.title.as_deref(),
            identifier,
            &pass1.first_page_runs,
            &self.options,
        );
        report.title_source = title.source;

        let headings = if use_bookmarks {
            log::debug!("{}: using {} bookmarks", identifier, bookmarks.len());
            report.outline_source = OutlineSource::Bookmarks;
            headings_from_bookmarks(&bookmarks)
        } else if pass1.timed_out {
            log::warn!("{}: no content outline, time budget spent in pass 1", identifier);
            Vec::new()
        } else {
            let pass2 = scanner.candidate_pass(&pass1.histogram, &pass1.skipped_pages)?;
            report.timed_out = pass2.timed_out;
            for page in pass2.skipped_pages {
                if !report.skipped_pages.contains(&page) {
                    report.skipped_pages.push(page);
                }
            }
            report.skipped_pages.sort_unstable();

            let classifier = HeadingClassifier::new(&pass1.histogram, &self.options, &self.patterns);
            let classification = classifier.classify(&pass2.candidates);
            report.heading_sizes = classification.tiers;
            report.outline_source = OutlineSource::Content;
            classification.headings
        };

        let outline = assemble(headings);
        if outline.is_empty() {
            report.outline_source = OutlineSource::None;
        }
        log::debug!(
            "{}: title from {:?}, {} headings from {:?}",
            identifier,
            report.title_source,
            outline.len(),
            report.outline_source
        );

        Ok(Extraction {
            result: DocumentResult::new(title.text, outline),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heading, HeadingLevel, TitleSource};
    use crate::parser::backend::{ContentOp, RawOutlineItem};
    use crate::parser::scanner::tests::{line, MockBackend};

    fn body_page(lines: usize) -> Vec<ContentOp> {
        (0..lines)
            .flat_map(|i| {
                line(
                    "Plain body text that fills the page with ordinary prose",
                    10.0,
                    false,
                    72.0,
                    600.0 - i as f32 * 14.0,
                )
            })
            .collect()
    }

    fn extract(backend: &MockBackend, options: OutlineOptions) -> Result<Extraction> {
        OutlineExtractor::new(options)?.extract(backend, "sample")
    }

    #[test]
    fn test_numbered_headings_from_content() {
        let mut page2 = line("1. Overview", 18.0, true, 72.0, 720.0);
        page2.extend(line("1.1 Scope", 14.0, true, 72.0, 690.0));
        page2.extend(body_page(8));
        let backend = MockBackend::new(vec![
            Some(body_page(10)),
            Some(body_page(10)),
            Some(page2),
        ]);

        let extraction = extract(&backend, OutlineOptions::default()).unwrap();
        assert_eq!(
            extraction.result.outline,
            vec![
                Heading::new(HeadingLevel::H1, "1. Overview", 2),
                Heading::new(HeadingLevel::H2, "1.1 Scope", 2),
            ]
        );
        assert_eq!(extraction.report.outline_source, OutlineSource::Content);
        assert_eq!(extraction.report.body_size, Some(10.0));
        assert_eq!(extraction.report.heading_sizes, vec![18.0, 14.0]);
    }

    #[test]
    fn test_bookmarks_take_precedence() {
        let mut backend = MockBackend::new(vec![
            Some(line("Big Heading", 24.0, true, 72.0, 720.0)),
            Some(body_page(4)),
        ]);
        backend.outline = vec![
            RawOutlineItem {
                title: "Intro".to_string(),
                depth: 1,
                target_page: Some(0),
            },
            RawOutlineItem {
                title: "Details".to_string(),
                depth: 2,
                target_page: Some(1),
            },
        ];

        let extraction = extract(&backend, OutlineOptions::default()).unwrap();
        assert_eq!(extraction.report.outline_source, OutlineSource::Bookmarks);
        assert_eq!(extraction.report.bookmark_count, 2);
        assert_eq!(
            extraction.result.outline,
            vec![
                Heading::new(HeadingLevel::H1, "Intro", 0),
                Heading::new(HeadingLevel::H2, "Details", 1),
            ]
        );
    }

    #[test]
    fn test_single_bookmark_falls_back_to_content() {
        let mut page0 = line("Introduction", 18.0, true, 72.0, 720.0);
        page0.extend(body_page(10));
        let mut backend = MockBackend::new(vec![Some(page0)]);
        backend.outline = vec![RawOutlineItem {
            title: "Only".to_string(),
            depth: 1,
            target_page: Some(0),
        }];

        let extraction = extract(&backend, OutlineOptions::default()).unwrap();
        assert_eq!(extraction.report.outline_source, OutlineSource::Content);
        assert_eq!(
            extraction.result.outline,
            vec![Heading::new(HeadingLevel::H1, "Introduction", 0)]
        );
    }

    #[test]
    fn test_corrupt_page_is_skipped() {
        let pages = (0..10)
            .map(|i| {
                if i == 5 {
                    return None;
                }
                let y = 720.0 - i as f32 * 10.0;
                let mut ops = line(&format!("{}. Part {}", i + 1, i + 1), 16.0, true, 72.0, y);
                ops.extend(body_page(6));
                Some(ops)
            })
            .collect();
        let backend = MockBackend::new(pages);

        let extraction = extract(&backend, OutlineOptions::default()).unwrap();
        let pages: Vec<u32> = extraction.result.outline.iter().map(|h| h.page).collect();
        assert_eq!(pages, vec![0, 1, 2, 3, 4, 6, 7, 8, 9]);
        assert_eq!(extraction.report.skipped_pages, vec![5]);
        assert!(!extraction.report.is_clean());
    }

    #[test]
    fn test_strict_mode_fails_on_corrupt_page() {
        let backend = MockBackend::new(vec![Some(body_page(3)), None]);
        let err = extract(&backend, OutlineOptions::default().strict()).unwrap_err();
        assert!(matches!(err, Error::InvalidContent { page: 1, .. }));
    }

    #[test]
    fn test_metadata_title_and_empty_outline() {
        let mut backend = MockBackend::new(vec![Some(body_page(5))]);
        backend.metadata.title = Some("Field Notes".to_string());

        let extraction = extract(&backend, OutlineOptions::default()).unwrap();
        assert_eq!(extraction.result.title, "Field Notes");
        assert_eq!(extraction.report.title_source, TitleSource::Metadata);
        assert!(extraction.result.outline.is_empty());
        assert_eq!(extraction.report.outline_source, OutlineSource::None);
    }

    #[test]
    fn test_spent_budget_yields_no_content_outline() {
        let mut page0 = line("Introduction", 18.0, true, 72.0, 720.0);
        page0.extend(body_page(4));
        let backend = MockBackend::new(vec![Some(page0)]);
        let options = OutlineOptions::default().with_time_budget(Some(std::time::Duration::ZERO));

        let extraction = extract(&backend, options).unwrap();
        assert!(extraction.report.timed_out);
        assert!(extraction.result.outline.is_empty());
    }

    #[test]
    fn test_failed_extraction_record() {
        let extraction = Extraction::failed(&Error::UnknownFormat);
        assert_eq!(extraction.result, DocumentResult::empty());
        assert!(extraction.report.failure.is_some());
    }
}
