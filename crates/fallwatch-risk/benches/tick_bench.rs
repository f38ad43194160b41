//! Per-tick cost of the risk engine.
//!
//! Run with: cargo bench --package fallwatch-risk

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fallwatch_risk::synthetic::{Scenario, ScenarioKind};
use fallwatch_risk::{effective_thresholds, RiskConfig, RiskEngine};

// =============================================================================
// Engine ticks
// =============================================================================

fn bench_scenarios(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
    let config = Arc::new(RiskConfig::default());
    let mut group = c.benchmark_group("engine_scenario");

    for kind in ScenarioKind::all() {
        let samples: Vec<_> = Scenario::new(kind, start).with_duration(60.0).samples().collect();
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(kind), &samples, |b, samples| {
            b.iter(|| {
                let mut engine = RiskEngine::new(Arc::clone(&config)).unwrap();
                for sample in samples.iter().cloned() {
                    black_box(engine.tick(sample));
                }
            });
        });
    }
    group.finish();
}

fn bench_frame_rates(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
    let config = Arc::new(RiskConfig::default());
    let mut group = c.benchmark_group("engine_frame_rate");

    for rate in [5.0, 15.0, 30.0] {
        let samples: Vec<_> = Scenario::new(ScenarioKind::UprightStill, start)
            .with_rate(rate)
            .with_duration(30.0)
            .samples()
            .collect();
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rate), &samples, |b, samples| {
            b.iter(|| {
                let mut engine = RiskEngine::new(Arc::clone(&config)).unwrap();
                for sample in samples.iter().cloned() {
                    black_box(engine.tick(sample));
                }
            });
        });
    }
    group.finish();
}

// =============================================================================
// Threshold adaptation
// =============================================================================

fn bench_thresholds(c: &mut Criterion) {
    let config = RiskConfig::default();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    c.bench_function("effective_thresholds", |b| {
        b.iter(|| effective_thresholds(black_box(&config), black_box(&now), black_box(Some(47.0))))
    });
}

criterion_group!(benches, bench_scenarios, bench_frame_rates, bench_thresholds);
criterion_main!(benches);
