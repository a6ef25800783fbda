//! Engine benchmarks over synthetic inputs.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use textdiff_lines::{compute_diff, DiffOptions};

fn synthetic_document(lines: usize) -> Vec<Vec<u8>> {
    (0..lines)
        .map(|i| format!("fn item_{i}() {{ process({}, {}); }}", i % 17, i % 5).into_bytes())
        .collect()
}

fn edited_document(base: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut modified: Vec<Vec<u8>> = base.to_vec();
    // Edit every tenth line and insert a new line every fifty.
    for i in (0..modified.len()).step_by(10) {
        modified[i] = format!("fn item_{i}() {{ process_all({}); }}", i % 17).into_bytes();
    }
    let mut i = modified.len();
    while i >= 50 {
        i -= 50;
        modified.insert(i, b"// inserted checkpoint".to_vec());
    }
    modified
}

fn bench_compute_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_diff");
    for &size in &[100usize, 500, 2000] {
        let original = synthetic_document(size);
        let modified = edited_document(&original);
        let original_refs: Vec<&[u8]> = original.iter().map(|l| l.as_slice()).collect();
        let modified_refs: Vec<&[u8]> = modified.iter().map(|l| l.as_slice()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| compute_diff(&original_refs, &modified_refs, &DiffOptions::default()));
        });
    }
    group.finish();
}

fn bench_move_detection(c: &mut Criterion) {
    let original = synthetic_document(400);
    let mut modified = original.clone();
    // Relocate a fifty-line block towards the end.
    let block: Vec<Vec<u8>> = modified.drain(20..70).collect();
    let insert_at = modified.len() - 40;
    for (k, line) in block.into_iter().enumerate() {
        modified.insert(insert_at + k, line);
    }
    let original_refs: Vec<&[u8]> = original.iter().map(|l| l.as_slice()).collect();
    let modified_refs: Vec<&[u8]> = modified.iter().map(|l| l.as_slice()).collect();
    let options = DiffOptions { compute_moves: true, ..DiffOptions::default() };
    c.bench_function("compute_diff_with_moves", |b| {
        b.iter(|| compute_diff(&original_refs, &modified_refs, &options));
    });
}

criterion_group!(benches, bench_compute_diff, bench_move_detection);
criterion_main!(benches);
