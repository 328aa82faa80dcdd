//! Criterion benchmarks for scoring hot paths.
//!
//! Benchmarks:
//! 1. Convergence evaluation (single ticker, sequential batch, rayon batch)
//! 2. Catalyst selection over a large calendar
//! 3. Pattern classification over growing histories

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use converge_core::catalyst::CatalystScorer;
use converge_core::convergence::ConvergenceEngine;
use converge_core::domain::{Bar, Catalyst, CatalystType, Impact, Signal, SignalKind, SignalSet};
use converge_core::pattern::PatternClassifier;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_signals(seed: usize) -> SignalSet {
    SignalKind::ALL
        .iter()
        .enumerate()
        .filter(|(i, _)| (seed + i) % 3 != 0)
        .map(|(i, kind)| Signal::new(*kind, ((seed * 7 + i * 13) % 100) as f64, "bench"))
        .collect()
}

fn make_batch(n: usize) -> Vec<(String, SignalSet)> {
    (0..n).map(|i| (format!("T{i:05}"), make_signals(i))).collect()
}

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 3.0;
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                close - 0.3,
                close + 1.0,
                close - 1.0,
                close,
                1_000_000 + (i as u64 % 500_000),
            )
        })
        .collect()
}

fn make_calendar(n: usize, as_of: chrono::NaiveDate) -> Vec<Catalyst> {
    let impacts = [Impact::Low, Impact::Medium, Impact::High, Impact::Binary];
    (0..n)
        .map(|i| {
            Catalyst::new(
                format!("T{:03}", i % 200),
                CatalystType::Earnings,
                as_of + chrono::Duration::days((i % 240) as i64 - 30),
                impacts[i % 4],
            )
        })
        .collect()
}

// ── 1. Convergence ───────────────────────────────────────────────────

fn bench_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("convergence");
    let engine = ConvergenceEngine::default();

    let single = make_signals(1);
    group.bench_function("evaluate_single", |b| {
        b.iter(|| engine.evaluate(black_box("NVDA"), black_box(&single)));
    });

    for &n in &[100, 1_000, 10_000] {
        let batch = make_batch(n);
        group.bench_with_input(BenchmarkId::new("sequential", n), &batch, |b, batch| {
            b.iter(|| {
                batch
                    .iter()
                    .filter_map(|(t, s)| engine.evaluate(t, s))
                    .count()
            });
        });
        group.bench_with_input(BenchmarkId::new("evaluate_many", n), &batch, |b, batch| {
            b.iter(|| engine.evaluate_many(black_box(batch)));
        });
    }

    group.finish();
}

// ── 2. Catalyst Selection ────────────────────────────────────────────

fn bench_catalysts(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalyst");
    let as_of = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let scorer = CatalystScorer::default();
    let calendar = make_calendar(5_000, as_of);

    group.bench_function("best_catalyst_5000", |b| {
        b.iter(|| scorer.best_catalyst(black_box(&calendar), black_box("T042"), as_of));
    });
    group.bench_function("alerts_5000", |b| {
        b.iter(|| scorer.alerts(black_box(&calendar), as_of, 14));
    });

    group.finish();
}

// ── 3. Pattern Classification ────────────────────────────────────────

fn bench_pattern(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern");
    let classifier = PatternClassifier::default();

    for &n in &[60, 252, 1260] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("classify", n), &bars, |b, bars| {
            b.iter(|| classifier.classify(black_box("SPY"), black_box(bars)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convergence, bench_catalysts, bench_pattern);
criterion_main!(benches);
