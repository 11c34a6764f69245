//! Policy evaluation benchmarks
//!
//! The evaluator sits on the packet-in hot path; every first packet of every
//! flow pays one full pass.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use zoneflow_common::ZoneName;
use zoneflow_policy::{FlowMetadata, PolicyConfig, PolicyEngine};

fn campus_engine(isolation_pairs: usize) -> PolicyEngine {
    let zones = ["student", "finance", "dean", "exam", "lab", "office"];
    let mut config = PolicyConfig::default();
    config.allow_exceptions.push(zoneflow_policy::config::ZonePair {
        src: ZoneName::new("finance"),
        dst: ZoneName::new("dean"),
    });
    config.protected_zones.push(zoneflow_policy::config::ProtectedZone {
        zone: ZoneName::new("finance"),
        allow_from: vec![ZoneName::new("dean")],
    });
    for i in 0..isolation_pairs {
        config.isolation_rules.push(zoneflow_policy::config::ZonePair {
            src: ZoneName::new(zones[i % zones.len()]),
            dst: ZoneName::new(zones[(i + 1) % zones.len()]),
        });
    }
    PolicyEngine::with_rules(config.build_rules())
}

fn bench_evaluate_hit(c: &mut Criterion) {
    let engine = campus_engine(8);
    let src = ZoneName::new("student");
    let dst = ZoneName::new("finance");
    let meta = FlowMetadata::default();

    c.bench_function("evaluate_deny_hit", |b| {
        b.iter(|| engine.evaluate(black_box(&src), black_box(&dst), black_box(&meta)))
    });
}

fn bench_evaluate_default(c: &mut Criterion) {
    let engine = campus_engine(8);
    let src = ZoneName::new("lab");
    let dst = ZoneName::new("office");
    let meta = FlowMetadata::default();

    c.bench_function("evaluate_default_allow", |b| {
        b.iter(|| engine.evaluate(black_box(&src), black_box(&dst), black_box(&meta)))
    });
}

fn bench_evaluate_wide_table(c: &mut Criterion) {
    let engine = campus_engine(64);
    let src = ZoneName::new("office");
    let dst = ZoneName::new("lab");
    let meta = FlowMetadata::default();

    c.bench_function("evaluate_64_rules", |b| {
        b.iter(|| engine.evaluate(black_box(&src), black_box(&dst), black_box(&meta)))
    });
}

criterion_group!(
    benches,
    bench_evaluate_hit,
    bench_evaluate_default,
    bench_evaluate_wide_table
);
criterion_main!(benches);
