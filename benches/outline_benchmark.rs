//! Benchmarks for pdfoutline extraction performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks run end-to-end extraction on synthetic PDFs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[path = "../tests/common/mod.rs"]
mod common;

use common::{body, bold, PdfBuilder};

/// A document with numbered headings on every page.
fn create_test_pdf(page_count: usize, with_bookmarks: bool) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    for i in 0..page_count {
        let mut lines = vec![
            bold(&format!("{}. Section Title", i + 1), 18.0, 750.0),
            bold(&format!("{}.1 Subsection", i + 1), 14.0, 720.0),
        ];
        lines.extend(body(40, 690.0));
        builder = builder.page(lines);
        if with_bookmarks {
            builder = builder
                .bookmark(&format!("Section {}", i + 1), 1, i)
                .bookmark(&format!("Subsection {}.1", i + 1), 2, i);
        }
    }
    builder.build()
}

/// Benchmark PDF format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1, false);
    let non_pdf_data = b"Not a PDF file at all, just random text content";

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| pdfoutline::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_non_pdf", |b| {
        b.iter(|| pdfoutline::detect_format_from_bytes(black_box(non_pdf_data)).is_err());
    });
}

/// Benchmark font-analysis extraction at various sizes.
fn bench_content_outline(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_outline");

    for page_count in [1, 10, 50].iter() {
        let data = create_test_pdf(*page_count, false);

        group.bench_function(format!("{}_pages", page_count), |b| {
            b.iter(|| pdfoutline::extract_bytes(black_box(&data), "bench"));
        });
    }

    group.finish();
}

/// Benchmark extraction when bookmarks are present.
fn bench_bookmark_outline(c: &mut Criterion) {
    let data = create_test_pdf(50, true);

    c.bench_function("bookmark_outline_50_pages", |b| {
        b.iter(|| pdfoutline::extract_bytes(black_box(&data), "bench"));
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_content_outline,
    bench_bookmark_outline,
);
criterion_main!(benches);
