//! The root coordinator: master clock and run-loop boundary.

use std::error::Error;
use std::fmt;

use chronon_core::{ConfigError, StepError, Time};

use crate::config::SimulationConfig;
use crate::coordinator::Coordinator;

/// Errors from [`RootCoordinator::load`].
///
/// Either the configuration was invalid (the run never constructs) or
/// a dynamics failed during the global init pass.
#[derive(Debug)]
pub enum LoadError {
    /// Validation rejected the configuration.
    Config(ConfigError),
    /// A dynamics callback failed while initializing.
    Init(StepError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Init(e) => write!(f, "initialization failed: {e}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Init(e) => Some(e),
        }
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StepError> for LoadError {
    fn from(e: StepError) -> Self {
        Self::Init(e)
    }
}

/// Top-level driver: owns the simulation begin/end times and loops the
/// coordinator until nothing remains or the end time passes.
///
/// The embedding contract is three calls: [`RootCoordinator::load`],
/// then [`RootCoordinator::run`] in a loop until it returns
/// `Ok(false)`, then [`RootCoordinator::finish`] —
/// or [`RootCoordinator::simulate`] for the whole sequence. External
/// cancellation (deadlines, wall-clock budgets) belongs between `run`
/// calls; there is no mid-step cancellation.
///
/// # Examples
///
/// ```
/// use chronon_core::Time;
/// use chronon_dynamics::{Dynamics, DynamicsFactory};
/// use chronon_engine::{Experiment, RootCoordinator, SimulationConfig};
/// use chronon_graph::ModelGraph;
///
/// struct Idle;
/// impl Dynamics for Idle {}
///
/// let mut graph = ModelGraph::new("top");
/// let a = graph.add_atomic(graph.root(), "a", &[], &[]).unwrap();
/// let mut factory = DynamicsFactory::new();
/// factory.register("idle", || Box::new(Idle));
///
/// let mut config = SimulationConfig::new(graph, factory);
/// config.bind(a, "idle");
/// config.experiment = Experiment::new(Time::ZERO, Time::new(10.0), 0);
///
/// let mut root = RootCoordinator::load(config).unwrap();
/// root.simulate().unwrap();
/// // A passive population has nothing to do; the clock never moved.
/// assert_eq!(root.current_time(), Time::ZERO);
/// ```
#[derive(Debug)]
pub struct RootCoordinator {
    coordinator: Coordinator,
    begin: Time,
    end: Time,
    current: Time,
}

impl RootCoordinator {
    /// Build the population, run the global init pass, and stand ready
    /// at the experiment begin.
    pub fn load(config: SimulationConfig) -> Result<Self, LoadError> {
        let begin = config.experiment.begin;
        let end = begin + config.experiment.duration;
        let mut coordinator = Coordinator::new(config)?;
        coordinator.initialize()?;
        Ok(Self {
            coordinator,
            begin,
            end,
            current: begin,
        })
    }

    /// Execute one step.
    ///
    /// Returns `Ok(false)` — without stepping — when no event remains
    /// or the next one falls past the end time; the run is over.
    pub fn run(&mut self) -> Result<bool, StepError> {
        let next = self.coordinator.next_time();
        if next.is_infinity() || (self.end - next).is_negative() {
            return Ok(false);
        }
        self.current = next;
        self.coordinator.run()?;
        Ok(true)
    }

    /// Flush and close every view, then release the population.
    pub fn finish(&mut self) {
        self.coordinator.finish();
    }

    /// Drive [`RootCoordinator::run`] to completion, then
    /// [`RootCoordinator::finish`].
    ///
    /// On error the views are deliberately *not* flushed: output
    /// written before the failure is left exactly as it was.
    pub fn simulate(&mut self) -> Result<(), StepError> {
        while self.run()? {}
        self.finish();
        Ok(())
    }

    /// First instant of the experiment.
    pub fn begin(&self) -> Time {
        self.begin
    }

    /// Last instant of the experiment (`begin + duration`).
    pub fn end(&self) -> Time {
        self.end
    }

    /// The master clock: the time of the last executed step.
    pub fn current_time(&self) -> Time {
        self.current
    }

    /// The coordinator, for inspecting simulators, views, and the
    /// graph mid- or post-run.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}
