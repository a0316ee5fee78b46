//! Views across a mid-run model removal: observables are cleared, no
//! dangling samples land after the removal, and sinks close once.

use chronon_core::{Time, Value};
use chronon_dynamics::{DynamicsFactory, StructuralChange};
use chronon_engine::{Experiment, RootCoordinator, SimulationConfig};
use chronon_graph::ModelGraph;
use chronon_obs::{MemoryStream, ViewKind};
use chronon_test_utils::{Counter, Generator, ScriptedExecutive};

#[test]
fn removal_clears_observables_without_dangling_samples() {
    let mut graph = ModelGraph::new("root");
    let top = graph.root();
    let gen = graph.add_atomic(top, "gen", &[], &["out"]).unwrap();
    let cnt = graph.add_atomic(top, "cnt", &["in"], &[]).unwrap();
    let exec = graph.add_atomic(top, "exec", &[], &[]).unwrap();
    graph.add_connection(top, "gen", "out", "cnt", "in").unwrap();

    let mut factory = DynamicsFactory::new();
    factory.register("gen", || Box::new(Generator::new(1.0)));
    factory.register("cnt", || Box::new(Counter::new()));
    factory.register("exec", || {
        Box::new(
            ScriptedExecutive::new(2.5).with_change(StructuralChange::RemoveModel {
                name: "gen".to_string(),
            }),
        )
    });

    let mut config = SimulationConfig::new(graph, factory);
    config.bind(gen, "gen");
    config.bind(cnt, "cnt");
    config.bind(exec, "exec");
    config.experiment = Experiment::new(Time::ZERO, Time::new(10.0), 0);

    // One event view watching both the generator and the counter.
    let (stream, events) = MemoryStream::new();
    config.add_view("events", ViewKind::Event, Box::new(stream));
    config.observe(gen, "fired", "events");
    config.observe(cnt, "count", "events");

    let mut root = RootCoordinator::load(config).unwrap();
    root.simulate().unwrap();

    // The generator series stops at its last firing before removal.
    let gen_series = events.values("root.gen", "fired");
    assert_eq!(
        gen_series.last().map(|(t, v)| (*t, v.clone())),
        Some((Time::new(2.0), Value::Integer(2)))
    );

    // The counter froze with it, and nothing was sampled afterwards.
    assert_eq!(
        events.last_value("root.cnt", "count"),
        Some(Value::Integer(2))
    );
    assert!(events
        .records()
        .iter()
        .all(|r| r.time <= Time::new(2.5)));

    // The population went quiet after the executive's own firing, so
    // the run ended there and the sink closed exactly once.
    assert_eq!(root.current_time(), Time::new(2.5));
    assert_eq!(events.closed_at(), Some(Time::new(2.5)));

    // The removed model is gone from the graph and the coordinator.
    let graph = root.coordinator().graph();
    assert!(graph.find_child(graph.root(), "gen").is_none());
}
