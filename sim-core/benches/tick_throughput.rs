use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::Simulation;
use sim_types::{default_world_config, TierConfig, WorldConfig};

fn crowded_config() -> WorldConfig {
    let mut config = default_world_config();
    config.grid_width = 60;
    config.grid_height = 40;
    config.wall_density = 0.05;
    config.green = TierConfig {
        robots: 20,
        wastes: 120,
        radioactivity_threshold: 1.0 / 3.0,
        deposit: None,
    };
    config.yellow = TierConfig {
        robots: 12,
        wastes: 60,
        radioactivity_threshold: 2.0 / 3.0,
        deposit: None,
    };
    config.red = TierConfig {
        robots: 8,
        wastes: 30,
        radioactivity_threshold: 1.0,
        deposit: None,
    };
    config
}

fn bench_500_ticks(c: &mut Criterion) {
    let config = crowded_config();
    c.bench_function("tick throughput / 500 ticks (60x40, 40 robots, seed 42)", |b| {
        b.iter_batched(
            || Simulation::new(config.clone(), 42).expect("simulation init"),
            |mut sim| black_box(sim.step_n(500)),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_500_ticks);
criterion_main!(benches);
