//! Views: sampling subscriptions over running simulators.

use chronon_core::{SimulatorId, Time, Value};

use crate::stream::Stream;

/// When a view samples its observables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewKind {
    /// After every step in which a watched simulator transitioned.
    Event,
    /// On a fixed timestep, starting at the experiment begin.
    Timed {
        /// The sampling period; must be positive.
        step: Time,
    },
    /// Once, at the end of the simulation.
    Finish,
}

/// One watched `(simulator, port)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observable {
    /// The watched simulator.
    pub simulator: SimulatorId,
    /// Full hierarchical name of the watched model (what the sink sees).
    pub model: String,
    /// The port to sample.
    pub port: String,
}

/// A named sampling subscription feeding one [`Stream`] sink.
///
/// The coordinator owns views, asks them *when* to sample
/// ([`View::next_sample`]) and *what* to sample ([`View::observables`]),
/// performs the sampling against the simulators, and hands results back
/// through [`View::record`]. The view forwards everything to its sink
/// and notifies it when observables come and go.
pub struct View {
    name: String,
    kind: ViewKind,
    stream: Box<dyn Stream>,
    observables: Vec<Observable>,
    next_sample: Time,
}

impl View {
    /// A new view with no observables. Timed views start sampling at
    /// the experiment begin; call [`View::start`] once it is known.
    pub fn new(name: impl Into<String>, kind: ViewKind, stream: Box<dyn Stream>) -> Self {
        Self {
            name: name.into(),
            kind,
            stream,
            observables: Vec::new(),
            next_sample: Time::INFINITY,
        }
    }

    /// The view's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sampling policy.
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Arm the sampling clock at the experiment begin.
    ///
    /// Only timed views schedule anything; their first sample falls on
    /// `begin` itself.
    pub fn start(&mut self, begin: Time) {
        if let ViewKind::Timed { .. } = self.kind {
            self.next_sample = begin;
        }
    }

    /// The next instant this view wants to sample at;
    /// [`Time::INFINITY`] for event and finish views.
    pub fn next_sample(&self) -> Time {
        self.next_sample
    }

    /// Move the sampling clock past `current`.
    pub fn advance_sample(&mut self, current: Time) {
        if let ViewKind::Timed { step } = self.kind {
            self.next_sample = current + step;
        }
    }

    /// Watch `(simulator, port)`. Re-adding an existing observable is a
    /// no-op; otherwise the sink is notified.
    pub fn add_observable(
        &mut self,
        simulator: SimulatorId,
        model: impl Into<String>,
        port: impl Into<String>,
        time: Time,
    ) {
        let obs = Observable {
            simulator,
            model: model.into(),
            port: port.into(),
        };
        if self.observables.contains(&obs) {
            return;
        }
        self.stream.observable_added(&obs.model, &obs.port, time);
        self.observables.push(obs);
    }

    /// Stop watching every port of `simulator`, notifying the sink per
    /// dropped observable. No-op when the simulator was not watched.
    pub fn remove_simulator(&mut self, simulator: SimulatorId, time: Time) {
        let mut kept = Vec::with_capacity(self.observables.len());
        for obs in self.observables.drain(..) {
            if obs.simulator == simulator {
                self.stream.observable_removed(&obs.model, &obs.port, time);
            } else {
                kept.push(obs);
            }
        }
        self.observables = kept;
    }

    /// `true` when any observable watches `simulator`.
    pub fn watches(&self, simulator: SimulatorId) -> bool {
        self.observables.iter().any(|o| o.simulator == simulator)
    }

    /// Every watched pair, in subscription order.
    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Forward one sampled value to the sink.
    pub fn record(&mut self, model: &str, port: &str, time: Time, value: Value) {
        self.stream.write_value(model, port, time, value);
    }

    /// Seal the sink. Called exactly once, at the end of the run.
    pub fn close(&mut self, time: Time) {
        self.stream.close(time);
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("observables", &self.observables)
            .field("next_sample", &self.next_sample)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn timed_views_sample_from_begin_on_a_fixed_step() {
        let (stream, _) = MemoryStream::new();
        let mut view = View::new(
            "grid",
            ViewKind::Timed {
                step: Time::new(0.5),
            },
            Box::new(stream),
        );
        assert_eq!(view.next_sample(), Time::INFINITY);

        view.start(Time::ZERO);
        assert_eq!(view.next_sample(), Time::ZERO);
        view.advance_sample(Time::ZERO);
        assert_eq!(view.next_sample(), Time::new(0.5));
    }

    #[test]
    fn event_views_never_schedule_samples() {
        let (stream, _) = MemoryStream::new();
        let mut view = View::new("ev", ViewKind::Event, Box::new(stream));
        view.start(Time::ZERO);
        assert_eq!(view.next_sample(), Time::INFINITY);
    }

    #[test]
    fn observables_dedup_and_remove_by_simulator() {
        let (stream, _) = MemoryStream::new();
        let mut view = View::new("ev", ViewKind::Event, Box::new(stream));
        let sim = SimulatorId(1);

        view.add_observable(sim, "root.cnt", "count", Time::ZERO);
        view.add_observable(sim, "root.cnt", "count", Time::ZERO);
        view.add_observable(sim, "root.cnt", "level", Time::ZERO);
        assert_eq!(view.observables().len(), 2);
        assert!(view.watches(sim));

        view.remove_simulator(sim, Time::new(1.0));
        assert!(!view.watches(sim));
        assert!(view.observables().is_empty());
    }

    #[test]
    fn record_reaches_the_sink() {
        let (stream, handle) = MemoryStream::new();
        let mut view = View::new("ev", ViewKind::Event, Box::new(stream));
        view.record("root.cnt", "count", Time::new(2.0), Value::Integer(4));
        view.close(Time::new(5.0));
        assert_eq!(
            handle.last_value("root.cnt", "count"),
            Some(Value::Integer(4))
        );
        assert_eq!(handle.closed_at(), Some(Time::new(5.0)));
    }
}
