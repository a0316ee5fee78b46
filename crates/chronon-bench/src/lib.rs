//! Population builders shared by the Chronon benchmarks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use chronon_dynamics::DynamicsFactory;
use chronon_engine::SimulationConfig;
use chronon_graph::ModelGraph;
use chronon_test_utils::{Counter, JitterGenerator};

/// `generators` jittered sources all feeding one counter — a fan-in
/// population with spread-out event times, so steps stay small and the
/// scheduler does real work.
pub fn fan_in_config(generators: usize) -> SimulationConfig {
    let mut graph = ModelGraph::new("bench");
    let root = graph.root();
    let counter = graph.add_atomic(root, "counter", &["in"], &[]).unwrap();

    let mut factory = DynamicsFactory::new();
    factory.register("counter", || Box::new(Counter::new()));

    let mut config_bindings = Vec::new();
    for i in 0..generators {
        let name = format!("gen{i}");
        let model = graph.add_atomic(root, &name, &[], &["out"]).unwrap();
        graph.add_connection(root, &name, "out", "counter", "in").unwrap();
        let dynamics = format!("gen{i}");
        let seed = i as u64;
        factory.register(&dynamics, move || {
            Box::new(JitterGenerator::new(seed, 1.0, 0.5))
        });
        config_bindings.push((model, dynamics));
    }

    let mut config = SimulationConfig::new(graph, factory);
    config.bind(counter, "counter");
    for (model, dynamics) in config_bindings {
        config.bind(model, dynamics);
    }
    config
}

/// A population where every generator shares one period, so every step
/// is a mass-simultaneous batch — worst case for imminent extraction.
pub fn lockstep_config(generators: usize) -> SimulationConfig {
    let mut graph = ModelGraph::new("bench");
    let root = graph.root();
    let counter = graph.add_atomic(root, "counter", &["in"], &[]).unwrap();

    let mut factory = DynamicsFactory::new();
    factory.register("counter", || Box::new(Counter::new()));
    factory.register("gen", || Box::new(chronon_test_utils::Generator::new(1.0)));

    let mut config_bindings = Vec::new();
    for i in 0..generators {
        let name = format!("gen{i}");
        let model = graph.add_atomic(root, &name, &[], &["out"]).unwrap();
        graph.add_connection(root, &name, "out", "counter", "in").unwrap();
        config_bindings.push(model);
    }

    let mut config = SimulationConfig::new(graph, factory);
    config.bind(counter, "counter");
    for model in config_bindings {
        config.bind(model, "gen");
    }
    config
}
