use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spawn_runtime::{
    compose, CompositionSpec, CompositionStrategy, CostCatalog, InterleaveCounts, PartCount,
    PartType, Priority, RequestPayload,
};

fn shared_quota_spec() -> CompositionSpec {
    let mut spec = CompositionSpec::new(Priority(5), RequestPayload::new("upgrader"));
    spec.default_parts = vec![PartType::Carry];
    spec.extra_parts = vec![PartType::Work, PartType::Work, PartType::Move];
    spec.parts_multiplier = 12;
    spec.min_cost = 250;
    spec
}

fn interleave_spec() -> CompositionSpec {
    let mut spec = CompositionSpec::new(Priority(1), RequestPayload::new("hauler"));
    spec.strategy = CompositionStrategy::RatioInterleave(InterleaveCounts {
        primary: PartCount::new(PartType::Carry, 24),
        secondary: PartCount::new(PartType::Work, 8),
        support: PartCount::new(PartType::Move, 16),
    });
    spec
}

fn bench_compose(c: &mut Criterion) {
    let catalog = CostCatalog::default();
    let mut group = c.benchmark_group("compose");

    for ceiling in [300u32, 800, 1_800, 5_600, 12_900] {
        let fill = shared_quota_spec();
        group.bench_with_input(
            BenchmarkId::new("priority_fill", ceiling),
            &ceiling,
            |b, &ceiling| b.iter(|| compose(black_box(&fill), ceiling, &catalog)),
        );
        let interleave = interleave_spec();
        group.bench_with_input(
            BenchmarkId::new("ratio_interleave", ceiling),
            &ceiling,
            |b, &ceiling| b.iter(|| compose(black_box(&interleave), ceiling, &catalog)),
        );
    }

    group.finish();
}

criterion_group!(compose_benches, bench_compose);
criterion_main!(compose_benches);
