//! The [`Dynamics`] trait: one atomic model's behavior.

use chronon_core::{DynamicsError, ExternalEventList, ObservationEvent, Time, Value};

use crate::executive::Executive;

/// The behavior of one atomic model instance.
///
/// The simulator wrapper drives this automaton: after `init`, the model
/// sits in a state whose duration is `time_advance()`. When that
/// duration expires the simulator calls `output` then
/// `internal_transition`; when events arrive earlier it calls
/// `external_transition`; when both happen at the same instant it calls
/// `confluent_transition` exactly once.
///
/// # Contract
///
/// - `time_advance()` MUST be non-negative (or infinite for a passive
///   state); the simulator rejects negative durations.
/// - Callbacks run to completion on the simulation thread and must not
///   block. An `Err` from any fallible callback aborts the whole run;
///   it is never retried.
/// - `output` takes `&self`: observing the imminent state must not
///   change it.
///
/// # Object safety
///
/// The trait is object-safe; the engine stores behaviors as
/// `Box<dyn Dynamics>`. `Send` so a whole kernel instance can move onto
/// a worker thread (the kernel itself stays single-threaded).
///
/// # Examples
///
/// A generator that emits on `"out"` once per period:
///
/// ```
/// use chronon_core::{DynamicsError, ExternalEventList, Time};
/// use chronon_dynamics::Dynamics;
///
/// struct Pulse {
///     period: Time,
/// }
///
/// impl Dynamics for Pulse {
///     fn time_advance(&self) -> Time {
///         self.period
///     }
///
///     fn output(&self, _time: Time, output: &mut ExternalEventList)
///         -> Result<(), DynamicsError>
///     {
///         output.emit("out");
///         Ok(())
///     }
/// }
///
/// let pulse = Pulse { period: Time::new(1.0) };
/// assert_eq!(pulse.time_advance(), Time::new(1.0));
/// ```
pub trait Dynamics: Send + 'static {
    /// Initialize the model at its creation time and return the
    /// duration of its initial state.
    ///
    /// The default returns [`Dynamics::time_advance`], so a model that
    /// computes its first deadline the same way as every later one
    /// needs no override.
    fn init(&mut self, time: Time) -> Result<Time, DynamicsError> {
        let _ = time;
        Ok(self.time_advance())
    }

    /// Duration of the current state. [`Time::INFINITY`] means passive
    /// (no internal event will fire until an external one arrives).
    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    /// Emit output events for the state that is about to expire.
    ///
    /// Called only when this model is imminent, immediately before its
    /// internal (or confluent) transition. Events name only the output
    /// port; the engine stamps the source and resolves targets.
    fn output(&self, time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
        let _ = (time, output);
        Ok(())
    }

    /// The scheduled time-advance expired: compute the next state.
    fn internal_transition(&mut self, time: Time) -> Result<(), DynamicsError> {
        let _ = time;
        Ok(())
    }

    /// Events arrived from other models: compute the next state.
    ///
    /// `time` is strictly before this model's own deadline (the
    /// simultaneous case goes to [`Dynamics::confluent_transition`]).
    fn external_transition(
        &mut self,
        events: &ExternalEventList,
        time: Time,
    ) -> Result<(), DynamicsError> {
        let _ = (events, time);
        Ok(())
    }

    /// The model is imminent *and* receiving at the same instant.
    ///
    /// Default policy: internal first, then external — override to
    /// resolve the conflict differently.
    fn confluent_transition(
        &mut self,
        time: Time,
        events: &ExternalEventList,
    ) -> Result<(), DynamicsError> {
        self.internal_transition(time)?;
        self.external_transition(events, time)
    }

    /// Sample one port of the model's state for a view.
    ///
    /// `None` means "no data for this port this instant" — a valid
    /// answer, not an error.
    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        let _ = event;
        None
    }

    /// The simulation is over; release whatever the model holds.
    fn finish(&mut self) {}

    /// The executive facet of this dynamics, if it has one.
    ///
    /// The engine uses this instead of downcasting: a plain model
    /// returns `None` (the default); an [`Executive`] returns itself so
    /// the coordinator can drain its structural-change queue after each
    /// of its transitions.
    fn executive(&mut self) -> Option<&mut dyn Executive> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records which transition callbacks ran, in order.
    struct Probe {
        calls: Vec<&'static str>,
    }

    impl Dynamics for Probe {
        fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
            self.calls.push("internal");
            Ok(())
        }

        fn external_transition(
            &mut self,
            _events: &ExternalEventList,
            _time: Time,
        ) -> Result<(), DynamicsError> {
            self.calls.push("external");
            Ok(())
        }
    }

    #[test]
    fn default_confluent_runs_internal_then_external() {
        let mut probe = Probe { calls: Vec::new() };
        probe
            .confluent_transition(Time::ZERO, &ExternalEventList::new())
            .unwrap();
        assert_eq!(probe.calls, ["internal", "external"]);
    }

    #[test]
    fn defaults_describe_a_passive_model() {
        struct Passive;
        impl Dynamics for Passive {}

        let mut p = Passive;
        assert_eq!(p.init(Time::ZERO).unwrap(), Time::INFINITY);
        assert_eq!(p.time_advance(), Time::INFINITY);
        assert!(p.executive().is_none());
        let ev = ObservationEvent::new("v", "p", Time::ZERO);
        assert_eq!(p.observation(&ev), None);
    }
}
