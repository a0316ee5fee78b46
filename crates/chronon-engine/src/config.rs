//! Simulation configuration: everything `RootCoordinator::load` consumes.

use indexmap::IndexMap;

use chronon_core::{ConfigError, ModelId, Time};
use chronon_dynamics::DynamicsFactory;
use chronon_graph::ModelGraph;
use chronon_obs::{Stream, ViewKind};

/// The experimental frame: where the clock starts, how long it runs,
/// and the seed stochastic models derive their generators from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Experiment {
    /// First instant of the run.
    pub begin: Time,
    /// Length of the run; the end time is `begin + duration`.
    pub duration: Time,
    /// Seed handed to stochastic dynamics at construction.
    pub seed: u64,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            begin: Time::ZERO,
            duration: Time::INFINITY,
            seed: 0,
        }
    }
}

impl Experiment {
    /// A finite experiment `[begin, begin + duration]`.
    pub fn new(begin: Time, duration: Time, seed: u64) -> Self {
        Self {
            begin,
            duration,
            seed,
        }
    }
}

/// One view to create at load: name, sampling policy, and sink.
pub struct ViewConfig {
    /// Unique view name.
    pub name: String,
    /// When the view samples.
    pub kind: ViewKind,
    /// Where sampled values go.
    pub stream: Box<dyn Stream>,
}

/// One observable attachment: watch `(model, port)` through `view`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservableConfig {
    /// The watched atomic model.
    pub model: ModelId,
    /// The port to sample.
    pub port: String,
    /// The receiving view's name.
    pub view: String,
}

/// Builder-input for one simulation: the model graph, the dynamics
/// bindings, the views, and the experimental frame.
///
/// Consumed by value by `RootCoordinator::load`. [`SimulationConfig::validate`]
/// checks every structural invariant up front; a bad configuration
/// never starts running.
pub struct SimulationConfig {
    /// The hierarchical model structure.
    pub graph: ModelGraph,
    /// Name-to-constructor dynamics bindings.
    pub factory: DynamicsFactory,
    /// Per-atomic-model constructor names.
    pub bindings: IndexMap<ModelId, String>,
    /// Views to create.
    pub views: Vec<ViewConfig>,
    /// Observables to attach after the init pass.
    pub observables: Vec<ObservableConfig>,
    /// The experimental frame.
    pub experiment: Experiment,
    /// Bound on consecutive same-instant steps before the run is
    /// declared stuck in a zero-delay cycle.
    pub max_zero_delay_steps: u32,
}

impl SimulationConfig {
    /// Default bound on consecutive same-instant steps.
    pub const DEFAULT_MAX_ZERO_DELAY_STEPS: u32 = 10_000;

    /// A configuration over `graph` and `factory` with no bindings,
    /// views, or observables yet.
    pub fn new(graph: ModelGraph, factory: DynamicsFactory) -> Self {
        Self {
            graph,
            factory,
            bindings: IndexMap::new(),
            views: Vec::new(),
            observables: Vec::new(),
            experiment: Experiment::default(),
            max_zero_delay_steps: Self::DEFAULT_MAX_ZERO_DELAY_STEPS,
        }
    }

    /// Bind `model` to the dynamics constructor named `dynamics`.
    pub fn bind(&mut self, model: ModelId, dynamics: impl Into<String>) {
        self.bindings.insert(model, dynamics.into());
    }

    /// Add a view.
    pub fn add_view(&mut self, name: impl Into<String>, kind: ViewKind, stream: Box<dyn Stream>) {
        self.views.push(ViewConfig {
            name: name.into(),
            kind,
            stream,
        });
    }

    /// Watch `(model, port)` through the view named `view`.
    pub fn observe(&mut self, model: ModelId, port: impl Into<String>, view: impl Into<String>) {
        self.observables.push(ObservableConfig {
            model,
            port: port.into(),
            view: view.into(),
        });
    }

    /// Check every load-time invariant.
    ///
    /// Graph structure, experiment duration, view name uniqueness and
    /// timestep sanity, a known dynamics binding for every atomic
    /// model, and resolvable observable attachments. The first
    /// violation is returned; the run never starts on any of them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;

        if self.experiment.duration.is_negative() {
            return Err(ConfigError::InvalidDuration {
                duration: self.experiment.duration,
            });
        }

        let mut names = std::collections::HashSet::new();
        for view in &self.views {
            if !names.insert(view.name.as_str()) {
                return Err(ConfigError::DuplicateView {
                    view: view.name.clone(),
                });
            }
            if let ViewKind::Timed { step } = view.kind {
                if !(step > Time::ZERO && step.is_finite()) {
                    return Err(ConfigError::InvalidTimestep {
                        view: view.name.clone(),
                        step,
                    });
                }
            }
        }

        for model in self.graph.atomics() {
            let Some(dynamics) = self.bindings.get(&model) else {
                return Err(ConfigError::MissingBinding {
                    model: self.graph.full_name(model),
                });
            };
            if !self.factory.contains(dynamics) {
                return Err(ConfigError::UnknownDynamics {
                    model: self.graph.full_name(model),
                    dynamics: dynamics.clone(),
                });
            }
        }

        for obs in &self.observables {
            let node = self
                .graph
                .get(obs.model)
                .ok_or(chronon_core::GraphError::RemovedModel { id: obs.model.0 })?;
            if !node.is_atomic() {
                return Err(chronon_core::GraphError::NotAtomic {
                    name: self.graph.full_name(obs.model),
                }
                .into());
            }
            if !self.views.iter().any(|v| v.name == obs.view) {
                return Err(ConfigError::UnknownView {
                    view: obs.view.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronon_core::{GraphError, Time};
    use chronon_dynamics::Dynamics;
    use chronon_obs::MemoryStream;

    struct Idle;
    impl Dynamics for Idle {}

    fn base_config() -> (SimulationConfig, ModelId) {
        let mut graph = ModelGraph::new("root");
        let root = graph.root();
        let a = graph.add_atomic(root, "a", &[], &[]).unwrap();
        let mut factory = DynamicsFactory::new();
        factory.register("idle", || Box::new(Idle));
        let mut config = SimulationConfig::new(graph, factory);
        config.bind(a, "idle");
        (config, a)
    }

    #[test]
    fn valid_configuration_passes() {
        let (config, _) = base_config();
        config.validate().unwrap();
    }

    #[test]
    fn missing_binding_is_named() {
        let (mut config, a) = base_config();
        config.bindings.shift_remove(&a);
        match config.validate().unwrap_err() {
            ConfigError::MissingBinding { model } => assert_eq!(model, "root.a"),
            other => panic!("expected MissingBinding, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dynamics_is_named() {
        let (mut config, a) = base_config();
        config.bind(a, "typo");
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::UnknownDynamics { .. }
        ));
    }

    #[test]
    fn duplicate_views_are_rejected() {
        let (mut config, _) = base_config();
        let (s1, _) = MemoryStream::new();
        let (s2, _) = MemoryStream::new();
        config.add_view("v", ViewKind::Event, Box::new(s1));
        config.add_view("v", ViewKind::Event, Box::new(s2));
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::DuplicateView { .. }
        ));
    }

    #[test]
    fn zero_timestep_is_rejected() {
        let (mut config, _) = base_config();
        let (s, _) = MemoryStream::new();
        config.add_view("grid", ViewKind::Timed { step: Time::ZERO }, Box::new(s));
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidTimestep { .. }
        ));
    }

    #[test]
    fn observable_needs_an_existing_view() {
        let (mut config, a) = base_config();
        config.observe(a, "count", "nope");
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::UnknownView { .. }
        ));
    }

    #[test]
    fn observable_on_a_coupled_model_is_rejected() {
        let (mut config, _) = base_config();
        let root = config.graph.root();
        let (s, _) = MemoryStream::new();
        config.add_view("v", ViewKind::Event, Box::new(s));
        config.observe(root, "count", "v");
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Graph(GraphError::NotAtomic { .. })
        ));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let (mut config, _) = base_config();
        config.experiment.duration = Time::new(-1.0);
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidDuration { .. }
        ));
    }
}
