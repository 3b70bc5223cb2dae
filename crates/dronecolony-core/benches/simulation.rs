use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dronecolony_core::config::SimConfig;
use dronecolony_core::engine::SimulationEngine;

fn config(colonies: usize) -> SimConfig {
    SimConfig {
        seed: 7,
        colony_count: colonies,
        teleporter_pairs: 1,
        neutral_buildings: 2,
        ..SimConfig::default()
    }
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Simulation");
    group.sample_size(10);

    for colonies in [1, 4] {
        // One simulated minute at 60 ticks per second.
        group.bench_function(format!("one minute, {} colonies", colonies), |b| {
            b.iter_batched(
                || SimulationEngine::new(config(colonies)).expect("valid config"),
                |mut engine| {
                    engine.run_for(60.0, 1.0 / 60.0);
                    black_box(engine.result().resources_gathered)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("map generation", |b| {
        b.iter(|| black_box(SimulationEngine::new(config(4)).expect("valid config").agent_count()));
    });

    group.finish();
}

criterion_group!(benches, bench_simulation);
criterion_main!(benches);
