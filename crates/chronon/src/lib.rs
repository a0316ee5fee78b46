//! Chronon: a DEVS multimodeling and simulation kernel.
//!
//! Assemble hierarchical models (atomic behaviors under coupled
//! structure), wire their ports, and run a conservative discrete-event
//! simulation that jumps the virtual clock between significant event
//! times.
//!
//! This facade re-exports the whole public surface:
//!
//! - [`ModelGraph`] — the hierarchical structure: atomic/coupled
//!   models, ports, connections.
//! - [`Dynamics`] / [`Executive`] — per-atomic-model behavior; an
//!   executive may also reshape the graph mid-run.
//! - [`View`] / [`Stream`] — sampling subscriptions and their sinks.
//! - [`SimulationConfig`] / [`RootCoordinator`] — assemble and drive a
//!   run.
//!
//! # Example
//!
//! A generator firing once per second into a counter, observed at the
//! end of a five-second run:
//!
//! ```
//! use chronon::{
//!     Dynamics, DynamicsError, DynamicsFactory, Experiment, ExternalEventList, MemoryStream,
//!     ModelGraph, ObservationEvent, RootCoordinator, SimulationConfig, Time, Value, ViewKind,
//! };
//!
//! struct Pulse;
//! impl Dynamics for Pulse {
//!     fn time_advance(&self) -> Time {
//!         Time::new(1.0)
//!     }
//!     fn output(&self, _t: Time, out: &mut ExternalEventList) -> Result<(), DynamicsError> {
//!         out.emit("out");
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Tally(i64);
//! impl Dynamics for Tally {
//!     fn external_transition(
//!         &mut self,
//!         events: &ExternalEventList,
//!         _t: Time,
//!     ) -> Result<(), DynamicsError> {
//!         self.0 += events.len() as i64;
//!         Ok(())
//!     }
//!     fn observation(&self, event: &ObservationEvent) -> Option<Value> {
//!         event.on_port("count").then(|| Value::Integer(self.0))
//!     }
//! }
//!
//! let mut graph = ModelGraph::new("top");
//! let root = graph.root();
//! let gen = graph.add_atomic(root, "gen", &[], &["out"]).unwrap();
//! let cnt = graph.add_atomic(root, "cnt", &["in"], &[]).unwrap();
//! graph.add_connection(root, "gen", "out", "cnt", "in").unwrap();
//!
//! let mut factory = DynamicsFactory::new();
//! factory.register("pulse", || Box::new(Pulse));
//! factory.register("tally", || Box::new(Tally::default()));
//!
//! let mut config = SimulationConfig::new(graph, factory);
//! config.bind(gen, "pulse");
//! config.bind(cnt, "tally");
//! config.experiment = Experiment::new(Time::ZERO, Time::new(5.0), 0);
//! let (stream, results) = MemoryStream::new();
//! config.add_view("final", ViewKind::Finish, Box::new(stream));
//! config.observe(cnt, "count", "final");
//!
//! let mut root = RootCoordinator::load(config).unwrap();
//! root.simulate().unwrap();
//! assert_eq!(results.last_value("top.cnt", "count"), Some(Value::Integer(5)));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use chronon_core::{
    Attributes, ConfigError, DynamicsError, ExternalEvent, ExternalEventList, GraphError, ModelId,
    ObservationEvent, ScheduleError, SimulatorId, StepError, Time, Value,
};
pub use chronon_dynamics::{Dynamics, DynamicsFactory, Executive, StructuralChange, StructuralChanges};
pub use chronon_engine::{
    Coordinator, Experiment, ImminentSet, LoadError, ObservableConfig, RootCoordinator, Scheduler,
    SimulationConfig, Simulator, ViewConfig,
};
pub use chronon_graph::{
    Coupled, InputLink, InternalConnection, ModelGraph, ModelKind, ModelNode, OutputLink,
};
pub use chronon_obs::{MemoryHandle, MemoryStream, Observable, Record, Stream, View, ViewKind};
