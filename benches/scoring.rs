//! Benchmarks for the scoring and association-analysis hot paths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use engram::domain::models::MemoryEntry;
use engram::services::{AssociationAnalyzer, MemoryScorer, ScoringParams};

fn make_entries(count: usize, dimension: usize) -> Vec<MemoryEntry> {
    (0..count)
        .map(|i| {
            let embedding: Vec<f32> = (0..dimension)
                .map(|d| ((i * 31 + d * 7) % 100) as f32 / 100.0 + 0.01)
                .collect();
            MemoryEntry::episodic("bench", format!("benchmark memory number {i}"))
                .with_embedding(embedding)
        })
        .collect()
}

fn bench_top_n(c: &mut Criterion) {
    let scorer = MemoryScorer::new(ScoringParams::default());
    let mut group = c.benchmark_group("scorer_top_n");
    for size in [100usize, 1000] {
        let entries = make_entries(size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| scorer.top_n(entries.clone(), 10));
        });
    }
    group.finish();
}

fn bench_analyzer(c: &mut Criterion) {
    let analyzer = AssociationAnalyzer::default();
    let mut group = c.benchmark_group("analyzer_full_pass");
    for dimension in [384usize, 3072] {
        let candidates = make_entries(100, dimension);
        let entry = &candidates[0];
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &(entry, &candidates),
            |b, (entry, candidates)| {
                b.iter(|| analyzer.analyze(entry, candidates));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_top_n, bench_analyzer);
criterion_main!(benches);
