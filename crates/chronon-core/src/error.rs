//! Error types for the Chronon simulation kernel.
//!
//! Organized by subsystem: graph (structure), dynamics (user behavior),
//! schedule (causality), config (load-time validation), and step (the
//! coordinator's per-step umbrella). Soft conditions — an unconnected
//! output port, an unrecognized observation port, an empty imminent
//! set — are not errors and never appear here.

use std::error::Error;
use std::fmt;

use crate::time::Time;

/// Errors from model-graph construction and structural mutation.
///
/// Raised when building a graph before a run, or when applying an
/// executive's structural-change request mid-run. Every variant names
/// the model/port so the diagnostic stands alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A sibling with this name already exists under `parent`.
    DuplicateModel {
        /// Full name of the parent coupled model.
        parent: String,
        /// The colliding child name.
        name: String,
    },
    /// No model with this name in the scope it was looked up in.
    UnknownModel {
        /// The name that failed to resolve.
        name: String,
    },
    /// The id refers to a slot vacated by a removal.
    RemovedModel {
        /// Display form of the stale id.
        id: u32,
    },
    /// A coupled-model operation was applied to an atomic model.
    NotCoupled {
        /// Full name of the offending model.
        name: String,
    },
    /// An atomic-model operation was applied to a coupled model.
    NotAtomic {
        /// Full name of the offending model.
        name: String,
    },
    /// The named port does not exist on the model.
    UnknownPort {
        /// Full name of the model.
        model: String,
        /// The missing port.
        port: String,
    },
    /// A connection endpoint is neither the coupled model itself nor a
    /// direct child — hierarchical relaying is mandatory.
    ForeignEndpoint {
        /// Full name of the coupled model owning the connection.
        coupled: String,
        /// The endpoint model that is out of scope.
        model: String,
    },
    /// The connection already exists.
    ConnectionExists {
        /// Full name of the coupled model owning the connection.
        coupled: String,
        /// `source.port -> target.port` rendering of the connection.
        connection: String,
    },
    /// No such connection to remove.
    UnknownConnection {
        /// Full name of the coupled model owning the connection.
        coupled: String,
        /// `source.port -> target.port` rendering of the connection.
        connection: String,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateModel { parent, name } => {
                write!(f, "coupled model '{parent}' already has a child '{name}'")
            }
            Self::UnknownModel { name } => write!(f, "unknown model '{name}'"),
            Self::RemovedModel { id } => {
                write!(f, "model id {id} refers to a removed model")
            }
            Self::NotCoupled { name } => write!(f, "model '{name}' is not a coupled model"),
            Self::NotAtomic { name } => write!(f, "model '{name}' is not an atomic model"),
            Self::UnknownPort { model, port } => {
                write!(f, "model '{model}' has no port '{port}'")
            }
            Self::ForeignEndpoint { coupled, model } => write!(
                f,
                "connection endpoint '{model}' is not '{coupled}' or one of its children"
            ),
            Self::ConnectionExists { coupled, connection } => {
                write!(f, "connection {connection} already exists in '{coupled}'")
            }
            Self::UnknownConnection { coupled, connection } => {
                write!(f, "no connection {connection} in '{coupled}'")
            }
        }
    }
}

impl Error for GraphError {}

/// Errors from user code inside a dynamics callback.
///
/// Returned by the fallible methods of the `Dynamics` contract. The
/// coordinator wraps them in [`StepError::DynamicsFailed`] with the
/// model's full hierarchical name; they are never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynamicsError {
    /// The callback could not compute the model's new state.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The callback received an event it cannot interpret.
    UnexpectedEvent {
        /// The port the event arrived on.
        port: String,
    },
}

impl DynamicsError {
    /// Shorthand for [`DynamicsError::Failed`] from any message.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DynamicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "{reason}"),
            Self::UnexpectedEvent { port } => {
                write!(f, "unexpected event on port '{port}'")
            }
        }
    }
}

impl Error for DynamicsError {}

/// Errors from the scheduler's causality guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// An insert tried to schedule before the current clock.
    TimeUnderflow {
        /// The rejected schedule time.
        scheduled: Time,
        /// The scheduler's clock at the time of the insert.
        clock: Time,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeUnderflow { scheduled, clock } => {
                write!(f, "schedule time {scheduled} is before the clock {clock}")
            }
        }
    }
}

impl Error for ScheduleError {}

/// Errors detected while validating a simulation configuration.
///
/// All fatal before the run starts; the caller gets a diagnostic naming
/// the model, port, or view at fault.
#[derive(Debug)]
pub enum ConfigError {
    /// The model graph is structurally invalid.
    Graph(GraphError),
    /// An atomic model has no dynamics binding.
    MissingBinding {
        /// Full name of the unbound model.
        model: String,
    },
    /// A binding names a dynamics constructor the factory does not know.
    UnknownDynamics {
        /// Full name of the model.
        model: String,
        /// The unresolved constructor name.
        dynamics: String,
    },
    /// Two views share a name.
    DuplicateView {
        /// The colliding view name.
        view: String,
    },
    /// An observable attachment references a view that does not exist.
    UnknownView {
        /// The unresolved view name.
        view: String,
    },
    /// The experiment duration is negative.
    InvalidDuration {
        /// The rejected duration.
        duration: Time,
    },
    /// A timed view's timestep is not a positive finite duration.
    InvalidTimestep {
        /// The offending view's name.
        view: String,
        /// The rejected timestep.
        step: Time,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "invalid model graph: {e}"),
            Self::MissingBinding { model } => {
                write!(f, "atomic model '{model}' has no dynamics binding")
            }
            Self::UnknownDynamics { model, dynamics } => write!(
                f,
                "model '{model}' is bound to unknown dynamics '{dynamics}'"
            ),
            Self::DuplicateView { view } => write!(f, "duplicate view '{view}'"),
            Self::UnknownView { view } => write!(f, "unknown view '{view}'"),
            Self::InvalidDuration { duration } => {
                write!(f, "experiment duration {duration} is negative")
            }
            Self::InvalidTimestep { view, step } => {
                write!(f, "timed view '{view}' has non-positive timestep {step}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for ConfigError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

/// Errors aborting a simulation step.
///
/// Returned from the coordinator's step and surfaced through the root
/// coordinator's run loop. The run is failed as a whole; output already
/// written to views is left as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A dynamics callback failed.
    DynamicsFailed {
        /// Full hierarchical name of the failing model.
        model: String,
        /// The underlying behavioral error.
        reason: DynamicsError,
    },
    /// A model's time-advance returned a negative duration.
    NegativeTimeAdvance {
        /// Full hierarchical name of the failing model.
        model: String,
        /// The rejected duration.
        advance: Time,
    },
    /// A reschedule violated the causality guard.
    Causality {
        /// Full hierarchical name of the failing model.
        model: String,
        /// The underlying scheduler error.
        reason: ScheduleError,
    },
    /// More consecutive same-instant steps than the configured bound —
    /// the model population contains a zero-delay cycle.
    ZeroDelayLoop {
        /// The instant the simulation is stuck at.
        time: Time,
        /// The bound that was exceeded.
        steps: u32,
    },
    /// A model emitted an output event on a port it never declared.
    ///
    /// Distinct from an unconnected port, which routes to nothing and
    /// is silently absorbed.
    UndeclaredPort {
        /// Full hierarchical name of the emitting model.
        model: String,
        /// The undeclared port.
        port: String,
    },
    /// An executive's structural-change request could not be applied.
    Structural {
        /// Full hierarchical name of the requesting executive.
        model: String,
        /// The underlying graph error.
        reason: GraphError,
    },
    /// An executive attached an observable to a view that does not exist.
    UnknownView {
        /// Full hierarchical name of the requesting executive.
        model: String,
        /// The unresolved view name.
        view: String,
    },
    /// An executive's add-model request named an unknown dynamics
    /// constructor.
    UnknownDynamics {
        /// Full hierarchical name of the requesting executive.
        model: String,
        /// The unresolved constructor name.
        dynamics: String,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicsFailed { model, reason } => {
                write!(f, "dynamics of '{model}' failed: {reason}")
            }
            Self::NegativeTimeAdvance { model, advance } => {
                write!(f, "negative time advance {advance} in '{model}'")
            }
            Self::Causality { model, reason } => {
                write!(f, "causality violation by '{model}': {reason}")
            }
            Self::ZeroDelayLoop { time, steps } => write!(
                f,
                "more than {steps} consecutive steps at time {time}; zero-delay cycle suspected"
            ),
            Self::UndeclaredPort { model, port } => {
                write!(f, "model '{model}' emitted on undeclared port '{port}'")
            }
            Self::Structural { model, reason } => {
                write!(f, "structural change by '{model}' failed: {reason}")
            }
            Self::UnknownView { model, view } => {
                write!(f, "executive '{model}' references unknown view '{view}'")
            }
            Self::UnknownDynamics { model, dynamics } => write!(
                f,
                "executive '{model}' references unknown dynamics '{dynamics}'"
            ),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DynamicsFailed { reason, .. } => Some(reason),
            Self::Causality { reason, .. } => Some(reason),
            Self::Structural { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_display_names_the_model() {
        let e = StepError::DynamicsFailed {
            model: "root.farm.cow".to_string(),
            reason: DynamicsError::failed("division by zero"),
        };
        assert_eq!(e.to_string(), "dynamics of 'root.farm.cow' failed: division by zero");
    }

    #[test]
    fn step_error_exposes_the_cause() {
        let e = StepError::Causality {
            model: "root.a".to_string(),
            reason: ScheduleError::TimeUnderflow {
                scheduled: Time::new(1.0),
                clock: Time::new(2.0),
            },
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn graph_error_display_is_self_contained() {
        let e = GraphError::UnknownPort {
            model: "root.gen".to_string(),
            port: "out".to_string(),
        };
        assert_eq!(e.to_string(), "model 'root.gen' has no port 'out'");
    }
}
