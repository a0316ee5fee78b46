//! Structural-change stress: an executive growing the population
//! while it runs.

use chronon_core::{DynamicsError, Time, Value};
use chronon_dynamics::{Dynamics, DynamicsFactory, Executive, StructuralChanges};
use chronon_engine::{Experiment, RootCoordinator, SimulationConfig};
use chronon_graph::ModelGraph;
use chronon_obs::{MemoryStream, ViewKind};
use chronon_test_utils::{Counter, Generator};

/// Spawns one generator per second, each wired into the hub counter.
struct Spawner {
    spawned: usize,
    changes: StructuralChanges,
}

impl Spawner {
    fn new() -> Self {
        Self {
            spawned: 0,
            changes: StructuralChanges::new(),
        }
    }
}

impl Dynamics for Spawner {
    fn time_advance(&self) -> Time {
        if self.spawned < 3 {
            Time::new(1.0)
        } else {
            Time::INFINITY
        }
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        self.spawned += 1;
        let name = format!("w{}", self.spawned);
        self.changes.add_model(&name, &[], &["out"], "worker");
        self.changes.add_connection(&name, "out", "hub", "in");
        Ok(())
    }

    fn executive(&mut self) -> Option<&mut dyn Executive> {
        Some(self)
    }
}

impl Executive for Spawner {
    fn changes(&mut self) -> &mut StructuralChanges {
        &mut self.changes
    }
}

#[test]
fn spawned_models_join_the_schedule_from_their_creation_step() {
    let mut graph = ModelGraph::new("root");
    let top = graph.root();
    let hub = graph.add_atomic(top, "hub", &["in"], &[]).unwrap();
    let spawner = graph.add_atomic(top, "spawner", &[], &[]).unwrap();

    let mut factory = DynamicsFactory::new();
    factory.register("hub", || Box::new(Counter::new()));
    factory.register("spawner", || Box::new(Spawner::new()));
    factory.register("worker", || Box::new(Generator::new(0.5)));

    let mut config = SimulationConfig::new(graph, factory);
    config.bind(hub, "hub");
    config.bind(spawner, "spawner");
    config.experiment = Experiment::new(Time::ZERO, Time::new(3.0), 0);
    let (stream, results) = MemoryStream::new();
    config.add_view("final", ViewKind::Finish, Box::new(stream));
    config.observe(hub, "count", "final");

    let mut root = RootCoordinator::load(config).unwrap();
    root.simulate().unwrap();

    // w1 spawns at 1.0 and fires at 1.5, 2.0, 2.5, 3.0; w2 spawns at
    // 2.0 and fires at 2.5, 3.0; w3 spawns at 3.0 and never fires
    // before the end. A model created at t is initialized with t as
    // its reference time, never fired within its creation step.
    assert_eq!(
        results.last_value("root.hub", "count"),
        Some(Value::Integer(6))
    );

    let coordinator = root.coordinator();
    let graph = coordinator.graph();
    for name in ["w1", "w2", "w3"] {
        assert!(graph.find_child(graph.root(), name).is_some());
    }
    let w3 = graph.find_child(graph.root(), "w3").unwrap();
    let sim = coordinator.simulator_for(w3).unwrap();
    assert_eq!(sim.last_time(), Time::new(3.0));
    assert_eq!(sim.next_internal(), Time::new(3.5));
}
