//! Benchmarks for pdfblocks layout performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks run the layout engine over synthetic fragment pages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdfblocks::{BBox, DocumentInput, DocumentTypography, Fragment, LayoutEngine, LayoutOptions, PageInput};

fn frag(text: &str, x0: f32, y0: f32, size: f32, page: usize) -> Fragment {
    let width = text.chars().count() as f32 * size * 0.5;
    Fragment::new(text, BBox::new(x0, y0, x0 + width, y0 + size), "Times-Roman", size).on_page(page)
}

/// Creates a two-column page with a heading, prose, a list and a small table.
fn create_test_page(page: usize) -> Vec<Fragment> {
    let mut fragments = vec![frag("Quarterly Report Across The Page", 50.0, 40.0, 20.0, page)];

    for (column, x0) in [50.0, 320.0].into_iter().enumerate() {
        for line in 0..30 {
            let y = 80.0 + line as f32 * 12.0 + (line / 6) as f32 * 10.0;
            let text = format!("Column {} line {} of running prose text here", column, line);
            fragments.push(frag(&text, x0, y, 10.0, page));
        }
    }

    for item in 0..5 {
        let text = format!("• List entry number {}", item);
        fragments.push(frag(&text, 50.0, 480.0 + item as f32 * 12.0, 10.0, page));
    }

    for row in 0..6 {
        let y = 560.0 + row as f32 * 14.0;
        fragments.push(frag(&format!("Item {}", row), 50.0, y, 10.0, page));
        fragments.push(frag(&format!("{}", row * 17), 200.0, y, 10.0, page));
        fragments.push(frag(&format!("{}.5", row * 3), 300.0, y, 10.0, page));
    }

    fragments
}

fn create_test_document(page_count: usize) -> DocumentInput {
    DocumentInput::from_fragments(
        (0..page_count).flat_map(create_test_page),
        612.0,
        792.0,
    )
}

/// Benchmark typography profiling.
fn bench_profile(c: &mut Criterion) {
    let doc = create_test_document(10);
    let engine = LayoutEngine::default();

    c.bench_function("profile_10_pages", |b| {
        b.iter(|| engine.profile(black_box(&doc)));
    });
}

/// Benchmark single page analysis.
fn bench_page(c: &mut Criterion) {
    let page = PageInput::letter(0).with_fragments(create_test_page(0));
    let typography = DocumentTypography::profile(page.fragments.iter());
    let engine = LayoutEngine::default();

    c.bench_function("analyze_page", |b| {
        b.iter(|| engine.analyze_page(black_box(&page), &typography));
    });
}

/// Benchmark document analysis at various sizes.
fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_document");

    for page_count in [1, 10, 50].iter() {
        let doc = create_test_document(*page_count);
        let parallel = LayoutEngine::default();
        let sequential = LayoutEngine::new(LayoutOptions::new().sequential()).unwrap();

        group.bench_function(format!("{}_pages_parallel", page_count), |b| {
            b.iter(|| parallel.analyze_document(black_box(&doc)));
        });
        group.bench_function(format!("{}_pages_sequential", page_count), |b| {
            b.iter(|| sequential.analyze_document(black_box(&doc)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_profile, bench_page, bench_document);
criterion_main!(benches);
