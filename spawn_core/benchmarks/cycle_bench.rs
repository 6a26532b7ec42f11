use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use spawn_core::{build_headless_app_with_config, run_cycle, FacilityId, SpawnConfig};
use spawn_runtime::Position;

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_cycle");

    for facilities in [1u32, 3, 8, 16] {
        group.bench_with_input(
            BenchmarkId::new("facilities", facilities),
            &facilities,
            |b, &facilities| {
                b.iter_batched(
                    || {
                        let mut app = build_headless_app_with_config(SpawnConfig::builtin());
                        for id in 0..facilities {
                            let position = Position::new(5 + (id as u8 % 8) * 5, 40);
                            spawn_core::spawn_facility(
                                &mut app.world,
                                FacilityId(100 + id),
                                position,
                            );
                        }
                        app
                    },
                    |mut app| {
                        for _ in 0..10 {
                            run_cycle(&mut app);
                        }
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(cycle_benches, bench_cycle);
criterion_main!(cycle_benches);
