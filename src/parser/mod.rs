//! PDF access and page feature scanning.

pub mod backend;
pub mod bookmarks;
pub mod histogram;
mod options;
pub mod scanner;

pub use backend::{LopdfBackend, PdfBackend};
pub use bookmarks::{extract_bookmarks, is_plausible};
pub use histogram::FontHistogram;
pub use options::{ErrorMode, OutlineOptions};
pub use scanner::{CandidatePass, HistogramPass, PageScanner};
