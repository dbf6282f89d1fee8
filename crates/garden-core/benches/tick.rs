use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use garden_core::prelude::*;

const T0: u64 = 1_700_000_000_000;

fn planted_engine(plot_count: usize) -> (GardenEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let config = GardenConfig {
        plot_count,
        ..GardenConfig::default().with_seed(7)
    };
    let mut engine = GardenEngine::new(config, Arc::new(Catalog::standard()), clock.clone());
    for plot in 0..plot_count {
        let plant = if plot % 2 == 0 { "tomato" } else { "carrot" };
        engine.plant(plot, plant);
    }
    (engine, clock)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for plot_count in [6, 64, 1024] {
        group.bench_function(format!("{plot_count}_plots"), |b| {
            let (mut engine, clock) = planted_engine(plot_count);
            b.iter(|| {
                clock.advance_ms(1_000);
                black_box(engine.tick())
            })
        });
    }
    group.finish();
}

fn bench_harvest_cycle(c: &mut Criterion) {
    c.bench_function("plant_grow_harvest", |b| {
        b.iter_batched(
            || planted_engine(6),
            |(mut engine, clock)| {
                clock.advance_secs(45);
                engine.tick();
                for plot in 0..6 {
                    black_box(engine.harvest(plot));
                }
                engine.take_stat_deltas()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_tick, bench_harvest_cycle);
criterion_main!(benches);
