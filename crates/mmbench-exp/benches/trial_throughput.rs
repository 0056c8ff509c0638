use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mmbench_core::{ExperimentConfiguration, TrialFailure, TrialOutcome, Variant};

use mmbench_exp::{aggregate, parse_duration};

fn sample_outcomes() -> Vec<TrialOutcome> {
    (0..10)
        .map(|idx| {
            if idx % 4 == 3 {
                TrialOutcome::failed(TrialFailure::NoTimingArtifact)
            } else {
                TrialOutcome::succeeded(115.0 + f64::from(idx))
            }
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let marked = "LINHAS,0,99\nCOLUNAS,0,799\nTEMPO,120.4375\n";
    let legacy = "120.4375\n";
    c.bench_function("parse_duration_marked", |b| {
        b.iter(|| parse_duration(black_box(marked)))
    });
    c.bench_function("parse_duration_legacy", |b| {
        b.iter(|| parse_duration(black_box(legacy)))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let configuration = ExperimentConfiguration::new(800, Variant::ProcessParallel, 20_000, 10);
    let outcomes = sample_outcomes();
    c.bench_function("aggregate_ten_trials", |b| {
        b.iter(|| aggregate(black_box(configuration), black_box(&outcomes)))
    });
}

criterion_group!(benches, bench_parse, bench_aggregate);
criterion_main!(benches);
