//! Directory batch driver.
//!
//! Every `*.pdf` in the input directory gets a `<stem>.json` in the output
//! directory, even when the document cannot be read. Documents are
//! independent and run on a Rayon pool.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::ExtractionReport;
use crate::outline::Extraction;
use crate::parser::OutlineOptions;
use crate::render::{to_json, JsonFormat};

/// Options for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker threads (0 = available CPUs)
    pub threads: usize,
    /// Output formatting
    pub json_format: JsonFormat,
    /// Per-document extraction options
    pub outline: OutlineOptions,
}

impl BatchOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the output formatting.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Set the extraction options.
    pub fn with_outline_options(mut self, options: OutlineOptions) -> Self {
        self.outline = options;
        self
    }
}

/// Progress notifications sent while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Processing is about to start
    Started { total: usize },
    /// One document is finished
    FileDone {
        stem: String,
        headings: usize,
        written: bool,
    },
    /// All documents are finished
    Finished { written: usize, total: usize },
}

/// What happened to one input file.
#[derive(Debug)]
pub struct FileOutcome {
    /// Input path
    pub input: PathBuf,
    /// File stem, used as document identifier
    pub stem: String,
    /// Path of the JSON record
    pub output: PathBuf,
    /// Number of outline entries written
    pub headings: usize,
    /// Extraction diagnostics
    pub report: ExtractionReport,
    /// Why the record could not be written, if it wasn't
    pub write_error: Option<Error>,
}

impl FileOutcome {
    /// Whether the output record exists.
    pub fn is_written(&self) -> bool {
        self.write_error.is_none()
    }
}

/// Summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One outcome per input, in input order
    pub outcomes: Vec<FileOutcome>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of inputs.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of records written.
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    /// Documents that could not be read at all.
    pub fn unreadable(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.report.failure.is_some())
            .count()
    }

    /// Whether every input got its output record.
    pub fn all_written(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_written)
    }
}

/// List `*.pdf` files (any extension case) in `dir`, sorted by file name.
pub fn collect_inputs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

/// Extract one file and write its `<stem>.json` into `out_dir`.
///
/// Read and parse failures still produce an (empty) record; only a failed
/// write leaves the file without output.
pub fn process_file(path: &Path, out_dir: &Path, options: &BatchOptions) -> FileOutcome {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = out_dir.join(format!("{}.json", stem));

    let extraction = isolated(path, || crate::extract_file_with_options(path, &options.outline));

    let write_error = to_json(&extraction.result, options.json_format)
        .and_then(|json| fs::write(&output, json).map_err(Error::from))
        .err();
    if let Some(e) = &write_error {
        log::warn!("Could not write {}: {}", output.display(), e);
    }

    FileOutcome {
        input: path.to_path_buf(),
        stem,
        output,
        headings: extraction.result.outline.len(),
        report: extraction.report,
        write_error,
    }
}

/// Run one document's extraction so that neither an error nor a panic
/// escapes it.
fn isolated<F>(path: &Path, extract: F) -> Extraction
where
    F: FnOnce() -> Result<Extraction>,
{
    match panic::catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(extraction)) => extraction,
        Ok(Err(e)) => {
            log::warn!("{}: {}", path.display(), e);
            Extraction::failed(&e)
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::warn!("{}: extraction panicked: {}", path.display(), message);
            Extraction::failed(&Error::Other(format!("extraction panicked: {}", message)))
        }
    }
}

/// Process every PDF in `input` into `output`.
///
/// Only an unreadable input directory or an output directory that cannot be
/// created is an error; individual documents never abort the run.
pub fn process_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &BatchOptions,
    events: Option<&Sender<BatchEvent>>,
) -> Result<BatchReport> {
    let start = Instant::now();
    let output = output.as_ref();
    let inputs = collect_inputs(input.as_ref())?;
    fs::create_dir_all(output)?;

    let send = |event: BatchEvent| {
        if let Some(tx) = events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    };
    send(BatchEvent::Started {
        total: inputs.len(),
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()
        .map_err(|e| Error::Other(format!("thread pool: {}", e)))?;

    let outcomes: Vec<FileOutcome> = pool.install(|| {
        inputs
            .par_iter()
            .map(|path| {
                let outcome = process_file(path, output, options);
                send(BatchEvent::FileDone {
                    stem: outcome.stem.clone(),
                    headings: outcome.headings,
                    written: outcome.is_written(),
                });
                outcome
            })
            .collect()
    });

    let report = BatchReport {
        outcomes,
        elapsed: start.elapsed(),
    };
    send(BatchEvent::Finished {
        written: report.written(),
        total: report.total(),
    });

    log::info!(
        "Processed {} documents in {:.2?}: {} written, {} unreadable",
        report.total(),
        report.elapsed,
        report.written(),
        report.unreadable()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use tempfile::TempDir;

    #[test]
    fn test_collect_inputs_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt", "c.pdf.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let inputs = collect_inputs(dir.path()).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_collect_inputs_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = collect_inputs(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unreadable_document_still_gets_a_record() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let path = input.path().join("garbage.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();

        let outcome = process_file(&path, output.path(), &BatchOptions::default());
        assert!(outcome.is_written());
        assert!(outcome.report.failure.is_some());

        let json = fs::read_to_string(output.path().join("garbage.json")).unwrap();
        let record = crate::DocumentResult::from_json(&json).unwrap();
        assert_eq!(record, crate::DocumentResult::empty());
    }

    #[test]
    fn test_panicking_extraction_becomes_failed_record() {
        let path = Path::new("odd.pdf");
        let extraction = isolated(path, || panic!("font dictionary without /Type"));
        assert_eq!(extraction.result, crate::DocumentResult::empty());
        let failure = extraction.report.failure.unwrap();
        assert!(failure.contains("font dictionary without /Type"), "{failure}");

        let extraction = isolated(path, || Err(Error::Encrypted));
        assert_eq!(extraction.report.failure.as_deref(), Some("Document is encrypted"));
    }

    #[test]
    fn test_process_directory_events() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("one.pdf"), b"not a pdf").unwrap();
        fs::write(input.path().join("two.pdf"), b"also not a pdf").unwrap();

        let (tx, rx) = unbounded();
        let options = BatchOptions::new().with_threads(2);
        let report =
            process_directory(input.path(), output.path().join("out"), &options, Some(&tx)).unwrap();
        drop(tx);

        assert!(report.all_written());
        assert_eq!(report.total(), 2);
        assert_eq!(report.unreadable(), 2);
        assert_eq!(report.outcomes[0].stem, "one");
        assert!(output.path().join("out/two.json").exists());

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.first(), Some(&BatchEvent::Started { total: 2 }));
        assert_eq!(
            events.last(),
            Some(&BatchEvent::Finished {
                written: 2,
                total: 2
            })
        );
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_empty_input_directory() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let report =
            process_directory(input.path(), output.path(), &BatchOptions::default(), None).unwrap();
        assert_eq!(report.total(), 0);
        assert!(report.all_written());
    }
}
