//! Extraction options and heuristic tuning constants.

use std::time::Duration;

/// Options for outline extraction.
///
/// The numeric thresholds are heuristics; the defaults are a starting point,
/// not a claim of optimality.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineOptions {
    /// Error handling mode for page-level failures
    pub error_mode: ErrorMode,

    /// Candidates longer than this (in characters) are body text
    pub max_heading_chars: usize,

    /// Upper bound for all-caps and title-case heading cues
    pub short_line_chars: usize,

    /// Minimum length of a first-line title
    pub min_title_chars: usize,

    /// Maximum length of a largest-font title
    pub max_title_chars: usize,

    /// Pages a line must recur on to count as a running header/footer
    pub running_header_min_pages: usize,

    /// Vertical tolerance (points) for "same position" header matching
    pub running_header_tolerance: f32,

    /// How much larger than the body mode a size must be to form a tier
    pub min_size_delta: f32,

    /// Soft per-document time budget (None = unlimited)
    pub time_budget: Option<Duration>,

    /// Inputs larger than this many bytes are rejected (0 = unlimited)
    pub max_file_bytes: u64,
}

impl OutlineOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail on the first unreadable page instead of skipping it.
    pub fn strict(self) -> Self {
        self.with_error_mode(ErrorMode::Strict)
    }

    /// Set the maximum heading length.
    pub fn with_max_heading_chars(mut self, chars: usize) -> Self {
        self.max_heading_chars = chars.max(1);
        self
    }

    /// Set the short-line bound used by textual cues.
    pub fn with_short_line_chars(mut self, chars: usize) -> Self {
        self.short_line_chars = chars.max(1);
        self
    }

    /// Set the minimum first-line title length.
    pub fn with_min_title_chars(mut self, chars: usize) -> Self {
        self.min_title_chars = chars;
        self
    }

    /// Set the maximum largest-font title length.
    pub fn with_max_title_chars(mut self, chars: usize) -> Self {
        self.max_title_chars = chars.max(1);
        self
    }

    /// Set the running header repetition count.
    pub fn with_running_header_min_pages(mut self, pages: usize) -> Self {
        self.running_header_min_pages = pages.max(2);
        self
    }

    /// Set the running header position tolerance.
    pub fn with_running_header_tolerance(mut self, points: f32) -> Self {
        self.running_header_tolerance = points.max(0.0);
        self
    }

    /// Set the minimum size delta above the body mode.
    pub fn with_min_size_delta(mut self, points: f32) -> Self {
        self.min_size_delta = points.max(0.0);
        self
    }

    /// Set the soft time budget.
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Set the input size guard.
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            max_heading_chars: 120,
            short_line_chars: 60,
            min_title_chars: 3,
            max_title_chars: 200,
            running_header_min_pages: 3,
            running_header_tolerance: 2.0,
            min_size_delta: 0.5,
            time_budget: Some(Duration::from_secs(10)),
            max_file_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Error handling mode during scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any page error
    Strict,
    /// Skip unreadable pages and continue
    #[default]
    Lenient,
}
