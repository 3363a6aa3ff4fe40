//! pdfoutline CLI - PDF title and outline extraction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};

use pdfoutline::batch::{process_directory, BatchEvent, BatchOptions};
use pdfoutline::{
    extract_file_with_options, render, JsonFormat, LopdfBackend, OutlineOptions, PdfBackend,
};

const DEFAULT_INPUT: &str = "/app/input";
const DEFAULT_OUTPUT: &str = "/app/output";

#[derive(Parser)]
#[command(name = "pdfoutline")]
#[command(version)]
#[command(about = "Extract PDF titles and H1-H3 outlines to JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every PDF in a directory (default)
    Batch {
        /// Input directory
        #[arg(value_name = "INPUT", env = "PDFOUTLINE_INPUT", default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "OUTPUT", env = "PDFOUTLINE_OUTPUT", default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Worker threads (0 = all CPUs)
        #[arg(short = 'j', long, env = "PDFOUTLINE_THREADS", default_value_t = 0)]
        threads: usize,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Extract a single PDF
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show how a document's outline was derived
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Heuristic thresholds, all optional.
#[derive(Args)]
struct Tuning {
    /// Fail a document on its first unreadable page
    #[arg(long, global = true, env = "PDFOUTLINE_STRICT")]
    strict: bool,

    /// Longest heading, in characters
    #[arg(long, global = true, env = "PDFOUTLINE_MAX_HEADING_CHARS")]
    max_heading_chars: Option<usize>,

    /// Longest line for all-caps and title-case cues
    #[arg(long, global = true, env = "PDFOUTLINE_SHORT_LINE_CHARS")]
    short_line_chars: Option<usize>,

    /// Shortest first-line title, in characters
    #[arg(long, global = true, env = "PDFOUTLINE_MIN_TITLE_CHARS")]
    min_title_chars: Option<usize>,

    /// Longest largest-font title, in characters
    #[arg(long, global = true, env = "PDFOUTLINE_MAX_TITLE_CHARS")]
    max_title_chars: Option<usize>,

    /// Pages a line must repeat on to be a running header
    #[arg(long, global = true, env = "PDFOUTLINE_RUNNING_HEADER_PAGES")]
    running_header_pages: Option<usize>,

    /// Vertical tolerance for running headers, in points
    #[arg(long, global = true, env = "PDFOUTLINE_RUNNING_HEADER_TOLERANCE")]
    running_header_tolerance: Option<f32>,

    /// Points above body size for a size tier
    #[arg(long, global = true, env = "PDFOUTLINE_MIN_SIZE_DELTA")]
    min_size_delta: Option<f32>,

    /// Soft time budget per document in seconds (0 = unlimited)
    #[arg(long, global = true, env = "PDFOUTLINE_TIME_BUDGET")]
    time_budget: Option<u64>,

    /// Largest accepted input in MiB (0 = unlimited)
    #[arg(long, global = true, env = "PDFOUTLINE_MAX_FILE_MB")]
    max_file_mb: Option<u64>,
}

impl Tuning {
    fn options(&self) -> OutlineOptions {
        let mut options = OutlineOptions::new();
        if self.strict {
            options = options.strict();
        }
        if let Some(chars) = self.max_heading_chars {
            options = options.with_max_heading_chars(chars);
        }
        if let Some(chars) = self.short_line_chars {
            options = options.with_short_line_chars(chars);
        }
        if let Some(chars) = self.min_title_chars {
            options = options.with_min_title_chars(chars);
        }
        if let Some(chars) = self.max_title_chars {
            options = options.with_max_title_chars(chars);
        }
        if let Some(pages) = self.running_header_pages {
            options = options.with_running_header_min_pages(pages);
        }
        if let Some(points) = self.running_header_tolerance {
            options = options.with_running_header_tolerance(points);
        }
        if let Some(points) = self.min_size_delta {
            options = options.with_min_size_delta(points);
        }
        if let Some(secs) = self.time_budget {
            options = options.with_time_budget((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(mb) = self.max_file_mb {
            options = options.with_max_file_bytes(mb.saturating_mul(1024 * 1024));
        }
        options
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = cli.tuning.options();

    let result = match cli.command {
        Some(Commands::Batch {
            input,
            output,
            threads,
            compact,
        }) => cmd_batch(&input, &output, threads, compact, options),
        Some(Commands::Extract {
            input,
            output,
            compact,
        }) => cmd_extract(&input, output.as_deref(), compact, &options),
        Some(Commands::Info { input }) => cmd_info(&input, &options),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: batch over the configured directories
            let input = env_path("PDFOUTLINE_INPUT", DEFAULT_INPUT);
            let output = env_path("PDFOUTLINE_OUTPUT", DEFAULT_OUTPUT);
            cmd_batch(&input, &output, 0, false, options)
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    threads: usize,
    compact: bool,
    options: OutlineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch_options = BatchOptions::new()
        .with_threads(threads)
        .with_json_format(json_format(compact))
        .with_outline_options(options);
    log::debug!(
        "Batch {} -> {} ({} threads)",
        input.display(),
        output.display(),
        threads
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let (tx, rx) = unbounded();
    let report = std::thread::scope(|scope| {
        let bar = pb.clone();
        scope.spawn(move || {
            for event in rx {
                match event {
                    BatchEvent::Started { total } => bar.set_length(total as u64),
                    BatchEvent::FileDone { stem, .. } => {
                        bar.set_message(stem);
                        bar.inc(1);
                    }
                    BatchEvent::Finished { .. } => break,
                }
            }
        });
        let report = process_directory(input, output, &batch_options, Some(&tx));
        drop(tx);
        report
    })?;
    pb.finish_and_clear();

    for outcome in &report.outcomes {
        if let Some(e) = &outcome.write_error {
            println!("  {} {}: {}", "✗".red(), outcome.input.display(), e);
        } else if let Some(failure) = &outcome.report.failure {
            println!(
                "  {} {} (empty record: {})",
                "!".yellow(),
                outcome.input.display(),
                failure
            );
        }
    }

    println!(
        "{} {}/{} records written to {} in {:.2?}",
        "Done!".green().bold(),
        report.written(),
        report.total(),
        output.display(),
        report.elapsed
    );

    if !report.all_written() {
        return Err(format!(
            "{} of {} inputs have no output",
            report.total() - report.written(),
            report.total()
        )
        .into());
    }
    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    options: &OutlineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let extraction = extract_file_with_options(input, options)?;
    let json = render::to_json(&extraction.result, json_format(compact))?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path, options: &OutlineOptions) -> Result<(), Box<dyn std::error::Error>> {
    let backend = LopdfBackend::load_file(input)?;
    let metadata = backend.metadata();
    let extraction = extract_file_with_options(input, options)?;
    let report = &extraction.report;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if metadata.encrypted { "Yes" } else { "No" }
    );
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Metadata title".bold(), title);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }

    println!();
    println!("{}", "Outline Analysis".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!(
        "{}: {} ({:?})",
        "Title".bold(),
        extraction.result.title,
        report.title_source
    );
    println!("{}: {}", "Bookmarks".bold(), report.bookmark_count);
    match report.body_size {
        Some(size) => println!("{}: {:.1} pt", "Body size".bold(), size),
        None => println!("{}: {}", "Body size".bold(), "no text".dimmed()),
    }
    if !report.heading_sizes.is_empty() {
        let tiers: Vec<String> = report
            .heading_sizes
            .iter()
            .map(|s| format!("{:.1}", s))
            .collect();
        println!("{}: {} pt", "Heading tiers".bold(), tiers.join(", "));
    }
    println!(
        "{}: {} headings ({:?})",
        "Outline".bold(),
        extraction.result.outline.len(),
        report.outline_source
    );
    if !report.skipped_pages.is_empty() {
        println!("{}: {:?}", "Skipped pages".yellow().bold(), report.skipped_pages);
    }
    if report.timed_out {
        println!("{}", "Time budget exceeded".yellow());
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfoutline".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF title and outline extraction tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huge_file_limit_saturates() {
        let cli = Cli::try_parse_from(["pdfoutline", "--max-file-mb", "18446744073709551615"]).unwrap();
        assert_eq!(cli.tuning.options().max_file_bytes, u64::MAX);
    }

    #[test]
    fn test_file_limit_in_mebibytes() {
        let cli = Cli::try_parse_from(["pdfoutline", "version", "--max-file-mb", "2"]).unwrap();
        assert_eq!(cli.tuning.options().max_file_bytes, 2 * 1024 * 1024);
        assert!(matches!(cli.command, Some(Commands::Version)));
    }
}
