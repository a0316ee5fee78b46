//! Strongly-typed identifiers for graph nodes and simulators.

use std::fmt;

/// Identifies a model node within a model graph.
///
/// Ids index a tombstoned arena: a removed model's slot is vacated and
/// never reused within a run, so a stale `ModelId` can be detected
/// instead of silently aliasing a newer model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ModelId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a simulator, the running wrapper around one atomic model
/// instance.
///
/// Same tombstoning discipline as [`ModelId`]: slots of simulators
/// removed mid-run by an executive stay vacant for the rest of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulatorId(pub u32);

impl fmt::Display for SimulatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SimulatorId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
