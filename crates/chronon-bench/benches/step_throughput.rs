//! End-to-end step throughput over generator populations.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use chronon_bench::{fan_in_config, lockstep_config};
use chronon_core::Time;
use chronon_engine::{Experiment, RootCoordinator};

fn run_population(
    c: &mut Criterion,
    name: &str,
    build: fn(usize) -> chronon_engine::SimulationConfig,
    generators: usize,
) {
    c.bench_function(name, |b| {
        b.iter_batched(
            || {
                let mut config = build(generators);
                config.experiment = Experiment::new(Time::ZERO, Time::new(50.0), 0);
                RootCoordinator::load(config).unwrap()
            },
            |mut root| {
                root.simulate().unwrap();
                root
            },
            BatchSize::SmallInput,
        )
    });
}

fn fan_in(c: &mut Criterion) {
    run_population(c, "fan_in_64_generators_50s", fan_in_config, 64);
}

fn lockstep(c: &mut Criterion) {
    run_population(c, "lockstep_64_generators_50s", lockstep_config, 64);
}

criterion_group!(benches, fan_in, lockstep);
criterion_main!(benches);
