//! The per-model simulator: one dynamics adapted to the step protocol.

use std::collections::HashMap;

use chronon_core::{
    ExternalEventList, ModelId, ObservationEvent, SimulatorId, StepError, Time, Value,
};
use chronon_dynamics::{Dynamics, StructuralChange};

/// Wraps one atomic model instance and its [`Dynamics`] object.
///
/// Owns the model's local event-time bookkeeping: `last_time` (when the
/// model last transitioned) and `next_internal` (when its current state
/// expires, possibly [`Time::INFINITY`] for a passive state). The
/// coordinator keeps `next_internal` and the scheduler entry in sync
/// after every transition.
///
/// Also hosts the per-output-port routing cache: resolved atomic
/// targets are remembered until a structural change flushes them.
pub struct Simulator {
    id: SimulatorId,
    model: ModelId,
    name: String,
    dynamics: Box<dyn Dynamics>,
    last_time: Time,
    next_internal: Time,
    targets: HashMap<String, Vec<(SimulatorId, String)>>,
}

impl Simulator {
    pub(crate) fn new(
        id: SimulatorId,
        model: ModelId,
        name: String,
        dynamics: Box<dyn Dynamics>,
    ) -> Self {
        Self {
            id,
            model,
            name,
            dynamics,
            last_time: Time::NEG_INFINITY,
            next_internal: Time::INFINITY,
            targets: HashMap::new(),
        }
    }

    /// This simulator's id.
    pub fn id(&self) -> SimulatorId {
        self.id
    }

    /// The wrapped atomic model.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Full hierarchical name of the wrapped model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time of the last transition; [`Time::NEG_INFINITY`] before init.
    pub fn last_time(&self) -> Time {
        self.last_time
    }

    /// Time of the next scheduled internal event.
    pub fn next_internal(&self) -> Time {
        self.next_internal
    }

    /// `true` when the wrapped dynamics has an executive facet.
    pub(crate) fn is_executive(&mut self) -> bool {
        self.dynamics.executive().is_some()
    }

    /// Drain the executive's structural-change queue; empty for plain
    /// dynamics.
    pub(crate) fn drain_changes(&mut self) -> Vec<StructuralChange> {
        match self.dynamics.executive() {
            Some(exec) => exec.changes().drain(),
            None => Vec::new(),
        }
    }

    /// Dynamics time-advance with the non-negativity check applied.
    fn time_advance(&self) -> Result<Time, StepError> {
        let advance = self.dynamics.time_advance();
        if advance.is_negative() {
            return Err(StepError::NegativeTimeAdvance {
                model: self.name.clone(),
                advance,
            });
        }
        Ok(advance)
    }

    fn behavioral(&self, reason: chronon_core::DynamicsError) -> StepError {
        StepError::DynamicsFailed {
            model: self.name.clone(),
            reason,
        }
    }

    /// Record a transition at `time` and compute the next deadline.
    fn settle(&mut self, time: Time) -> Result<Time, StepError> {
        let advance = self.time_advance()?;
        self.last_time = time;
        self.next_internal = time + advance;
        Ok(self.next_internal)
    }

    /// Initialize the dynamics at `time`; returns the first deadline.
    pub(crate) fn init(&mut self, time: Time) -> Result<Time, StepError> {
        let duration = self
            .dynamics
            .init(time)
            .map_err(|e| self.behavioral(e))?;
        if duration.is_negative() {
            return Err(StepError::NegativeTimeAdvance {
                model: self.name.clone(),
                advance: duration,
            });
        }
        self.last_time = time;
        self.next_internal = time + duration;
        Ok(self.next_internal)
    }

    /// Collect this simulator's output events into `out`, stamping the
    /// source. Only called when `time` equals the model's deadline.
    pub(crate) fn output(
        &mut self,
        time: Time,
        out: &mut ExternalEventList,
    ) -> Result<(), StepError> {
        debug_assert_eq!(time, self.next_internal, "output before the deadline");
        let mut produced = ExternalEventList::new();
        self.dynamics
            .output(time, &mut produced)
            .map_err(|e| self.behavioral(e))?;
        for event in produced.iter_mut() {
            event.set_source(self.id);
        }
        out.extend(produced);
        Ok(())
    }

    /// The scheduled deadline expired with no external events.
    pub(crate) fn internal_transition(&mut self, time: Time) -> Result<Time, StepError> {
        debug_assert_eq!(time, self.next_internal, "internal before the deadline");
        self.dynamics
            .internal_transition(time)
            .map_err(|e| self.behavioral(e))?;
        self.settle(time)
    }

    /// External events arrived strictly before the deadline.
    pub(crate) fn external_transition(
        &mut self,
        events: &ExternalEventList,
        time: Time,
    ) -> Result<Time, StepError> {
        debug_assert!(time <= self.next_internal, "external after the deadline");
        self.dynamics
            .external_transition(events, time)
            .map_err(|e| self.behavioral(e))?;
        self.settle(time)
    }

    /// Imminent and receiving at the same instant: exactly one call.
    pub(crate) fn confluent_transition(
        &mut self,
        time: Time,
        events: &ExternalEventList,
    ) -> Result<Time, StepError> {
        debug_assert_eq!(time, self.next_internal, "confluent off the deadline");
        self.dynamics
            .confluent_transition(time, events)
            .map_err(|e| self.behavioral(e))?;
        self.settle(time)
    }

    /// Sample one port; `None` is "no data", not an error.
    pub(crate) fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        self.dynamics.observation(event)
    }

    /// End-of-run hook.
    pub(crate) fn finish(&mut self) {
        self.dynamics.finish();
    }

    // ── Routing cache ────────────────────────────────────────────

    pub(crate) fn cached_targets(&self, port: &str) -> Option<&Vec<(SimulatorId, String)>> {
        self.targets.get(port)
    }

    pub(crate) fn cache_targets(&mut self, port: &str, targets: Vec<(SimulatorId, String)>) {
        self.targets.insert(port.to_string(), targets);
    }

    pub(crate) fn clear_target_cache(&mut self) {
        self.targets.clear();
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("name", &self.name)
            .field("last_time", &self.last_time)
            .field("next_internal", &self.next_internal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronon_core::DynamicsError;
    use chronon_dynamics::Dynamics;

    /// Emits one event per period on "out".
    struct Pulse {
        period: f64,
    }

    impl Dynamics for Pulse {
        fn time_advance(&self) -> Time {
            Time::new(self.period)
        }

        fn output(&self, _time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
            output.emit("out");
            Ok(())
        }
    }

    fn pulse_simulator(period: f64) -> Simulator {
        Simulator::new(
            SimulatorId(0),
            ModelId(1),
            "root.pulse".to_string(),
            Box::new(Pulse { period }),
        )
    }

    #[test]
    fn init_computes_the_first_deadline() {
        let mut sim = pulse_simulator(1.5);
        let next = sim.init(Time::new(2.0)).unwrap();
        assert_eq!(next, Time::new(3.5));
        assert_eq!(sim.last_time(), Time::new(2.0));
        assert_eq!(sim.next_internal(), Time::new(3.5));
    }

    #[test]
    fn output_stamps_the_source() {
        let mut sim = pulse_simulator(1.0);
        sim.init(Time::ZERO).unwrap();
        let mut out = ExternalEventList::new();
        sim.output(Time::new(1.0), &mut out).unwrap();
        assert_eq!(out.len(), 1);
        let ev = out.iter().next().unwrap();
        assert_eq!(ev.source(), Some(SimulatorId(0)));
        assert_eq!(ev.port(), "out");
    }

    #[test]
    fn internal_transition_reschedules() {
        let mut sim = pulse_simulator(1.0);
        sim.init(Time::ZERO).unwrap();
        let next = sim.internal_transition(Time::new(1.0)).unwrap();
        assert_eq!(next, Time::new(2.0));
        assert_eq!(sim.last_time(), Time::new(1.0));
    }

    #[test]
    fn negative_time_advance_is_fatal_and_named() {
        struct Broken;
        impl Dynamics for Broken {
            fn time_advance(&self) -> Time {
                Time::new(-1.0)
            }
        }

        let mut sim = Simulator::new(
            SimulatorId(0),
            ModelId(1),
            "root.broken".to_string(),
            Box::new(Broken),
        );
        match sim.init(Time::ZERO).unwrap_err() {
            StepError::NegativeTimeAdvance { model, advance } => {
                assert_eq!(model, "root.broken");
                assert_eq!(advance, Time::new(-1.0));
            }
            other => panic!("expected NegativeTimeAdvance, got {other:?}"),
        }
    }

    #[test]
    fn dynamics_failure_carries_the_model_name() {
        struct Failing;
        impl Dynamics for Failing {
            fn time_advance(&self) -> Time {
                Time::new(1.0)
            }
            fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
                Err(DynamicsError::failed("state table exhausted"))
            }
        }

        let mut sim = Simulator::new(
            SimulatorId(0),
            ModelId(1),
            "root.failing".to_string(),
            Box::new(Failing),
        );
        sim.init(Time::ZERO).unwrap();
        match sim.internal_transition(Time::new(1.0)).unwrap_err() {
            StepError::DynamicsFailed { model, .. } => assert_eq!(model, "root.failing"),
            other => panic!("expected DynamicsFailed, got {other:?}"),
        }
    }

    #[test]
    fn passive_models_settle_at_infinity() {
        struct Passive;
        impl Dynamics for Passive {}

        let mut sim = Simulator::new(
            SimulatorId(0),
            ModelId(1),
            "root.passive".to_string(),
            Box::new(Passive),
        );
        assert_eq!(sim.init(Time::ZERO).unwrap(), Time::INFINITY);
        let next = sim
            .external_transition(&ExternalEventList::new(), Time::new(3.0))
            .unwrap();
        assert_eq!(next, Time::INFINITY);
        assert_eq!(sim.last_time(), Time::new(3.0));
    }
}
