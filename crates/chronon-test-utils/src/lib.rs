//! Canned dynamics for Chronon development.
//!
//! Small, predictable behaviors used across engine tests and benches:
//! a periodic [`Generator`], an event [`Counter`], a buffering
//! [`Relay`], a [`FailAfter`] fault injector, a one-shot
//! [`ScriptedExecutive`], and a seeded stochastic [`JitterGenerator`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;

use chronon_core::{
    DynamicsError, ExternalEvent, ExternalEventList, ObservationEvent, Time, Value,
};
use chronon_dynamics::{Dynamics, Executive, StructuralChange, StructuralChanges};

/// Emits one event on `"out"` every `period`, counting its firings.
///
/// `observation("fired")` reports how often it has fired.
pub struct Generator {
    period: Time,
    fired: i64,
}

impl Generator {
    pub fn new(period: f64) -> Self {
        Self {
            period: Time::new(period),
            fired: 0,
        }
    }
}

impl Dynamics for Generator {
    fn time_advance(&self) -> Time {
        self.period
    }

    fn output(&self, _time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
        output.push(ExternalEvent::new("out").with_attribute("index", self.fired + 1));
        Ok(())
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        self.fired += 1;
        Ok(())
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("fired").then(|| Value::Integer(self.fired))
    }
}

/// Passive event sink counting every delivered event.
///
/// `observation("count")` reports the total.
#[derive(Default)]
pub struct Counter {
    count: i64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dynamics for Counter {
    fn external_transition(
        &mut self,
        events: &ExternalEventList,
        _time: Time,
    ) -> Result<(), DynamicsError> {
        self.count += events.len() as i64;
        Ok(())
    }

    fn observation(&self, event: &ObservationEvent) -> Option<Value> {
        event.on_port("count").then(|| Value::Integer(self.count))
    }
}

/// Does nothing, forever.
pub struct Passive;

impl Dynamics for Passive {}

/// Buffers incoming events and re-emits them on `"out"` after `delay`.
///
/// With `delay == 0` and a cyclic coupling this builds the classic
/// zero-delay loop.
pub struct Relay {
    delay: Time,
    pending: Vec<ExternalEvent>,
}

impl Relay {
    pub fn new(delay: f64) -> Self {
        Self {
            delay: Time::new(delay),
            pending: Vec::new(),
        }
    }
}

impl Dynamics for Relay {
    fn time_advance(&self) -> Time {
        if self.pending.is_empty() {
            Time::INFINITY
        } else {
            self.delay
        }
    }

    fn output(&self, _time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
        for event in &self.pending {
            let mut forwarded = ExternalEvent::new("out");
            for (name, value) in event.attributes() {
                forwarded.set_attribute(name.clone(), value.clone());
            }
            output.push(forwarded);
        }
        Ok(())
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        self.pending.clear();
        Ok(())
    }

    fn external_transition(
        &mut self,
        events: &ExternalEventList,
        _time: Time,
    ) -> Result<(), DynamicsError> {
        self.pending.extend(events.iter().cloned());
        Ok(())
    }
}

/// Emits on `"out"` every `period` and fails its `succeed_count + 1`-th
/// internal transition.
pub struct FailAfter {
    period: Time,
    succeed_count: usize,
    transitions: usize,
}

impl FailAfter {
    pub fn new(period: f64, succeed_count: usize) -> Self {
        Self {
            period: Time::new(period),
            succeed_count,
            transitions: 0,
        }
    }
}

impl Dynamics for FailAfter {
    fn time_advance(&self) -> Time {
        self.period
    }

    fn output(&self, _time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
        output.emit("out");
        Ok(())
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        if self.transitions >= self.succeed_count {
            return Err(DynamicsError::failed("injected failure"));
        }
        self.transitions += 1;
        Ok(())
    }
}

/// An executive that fires once at an absolute time and queues a fixed
/// script of structural changes.
pub struct ScriptedExecutive {
    fire_at: Time,
    script: Vec<StructuralChange>,
    changes: StructuralChanges,
    fired: bool,
}

impl ScriptedExecutive {
    pub fn new(fire_at: f64) -> Self {
        Self {
            fire_at: Time::new(fire_at),
            script: Vec::new(),
            changes: StructuralChanges::new(),
            fired: false,
        }
    }

    /// Append one change to the one-shot script.
    pub fn with_change(mut self, change: StructuralChange) -> Self {
        self.script.push(change);
        self
    }
}

impl Dynamics for ScriptedExecutive {
    fn init(&mut self, time: Time) -> Result<Time, DynamicsError> {
        Ok(self.fire_at - time)
    }

    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        if !self.fired {
            self.fired = true;
            for change in self.script.drain(..) {
                self.changes.push(change);
            }
        }
        Ok(())
    }

    fn executive(&mut self) -> Option<&mut dyn Executive> {
        Some(self)
    }
}

impl Executive for ScriptedExecutive {
    fn changes(&mut self) -> &mut StructuralChanges {
        &mut self.changes
    }
}

/// A generator whose period jitters around `base` by a seeded amount —
/// deterministic per seed, different across seeds.
pub struct JitterGenerator {
    rng: ChaCha8Rng,
    base: f64,
    jitter: f64,
    next: Time,
}

impl JitterGenerator {
    pub fn new(seed: u64, base: f64, jitter: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let next = Self::draw(&mut rng, base, jitter);
        Self {
            rng,
            base,
            jitter,
            next,
        }
    }

    fn draw(rng: &mut ChaCha8Rng, base: f64, jitter: f64) -> Time {
        if jitter > 0.0 {
            Time::new(base + rng.random_range(0.0..jitter))
        } else {
            Time::new(base)
        }
    }
}

impl Dynamics for JitterGenerator {
    fn time_advance(&self) -> Time {
        self.next
    }

    fn output(&self, _time: Time, output: &mut ExternalEventList) -> Result<(), DynamicsError> {
        output.emit("out");
        Ok(())
    }

    fn internal_transition(&mut self, _time: Time) -> Result<(), DynamicsError> {
        self.next = Self::draw(&mut self.rng, self.base, self.jitter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_counts_its_firings() {
        let mut g = Generator::new(1.0);
        assert_eq!(g.time_advance(), Time::new(1.0));
        g.internal_transition(Time::new(1.0)).unwrap();
        g.internal_transition(Time::new(2.0)).unwrap();
        let obs = ObservationEvent::new("v", "fired", Time::new(2.0));
        assert_eq!(g.observation(&obs), Some(Value::Integer(2)));
    }

    #[test]
    fn relay_goes_active_only_while_holding_events() {
        let mut r = Relay::new(0.5);
        assert_eq!(r.time_advance(), Time::INFINITY);

        let mut incoming = ExternalEventList::new();
        incoming.emit("in");
        r.external_transition(&incoming, Time::new(1.0)).unwrap();
        assert_eq!(r.time_advance(), Time::new(0.5));

        let mut out = ExternalEventList::new();
        r.output(Time::new(1.5), &mut out).unwrap();
        assert_eq!(out.len(), 1);
        r.internal_transition(Time::new(1.5)).unwrap();
        assert_eq!(r.time_advance(), Time::INFINITY);
    }

    #[test]
    fn fail_after_succeeds_then_fails() {
        let mut f = FailAfter::new(1.0, 2);
        f.internal_transition(Time::new(1.0)).unwrap();
        f.internal_transition(Time::new(2.0)).unwrap();
        assert!(f.internal_transition(Time::new(3.0)).is_err());
    }

    #[test]
    fn jitter_generator_is_deterministic_per_seed() {
        let mut a = JitterGenerator::new(42, 1.0, 0.25);
        let mut b = JitterGenerator::new(42, 1.0, 0.25);
        for step in 0..8 {
            assert_eq!(a.time_advance(), b.time_advance());
            let t = Time::new(step as f64);
            a.internal_transition(t).unwrap();
            b.internal_transition(t).unwrap();
        }
    }

    #[test]
    fn scripted_executive_queues_its_script_once() {
        let mut exec = ScriptedExecutive::new(2.5).with_change(StructuralChange::RemoveModel {
            name: "gen".to_string(),
        });
        assert_eq!(exec.init(Time::ZERO).unwrap(), Time::new(2.5));

        exec.internal_transition(Time::new(2.5)).unwrap();
        let drained = exec.changes().drain();
        assert_eq!(drained.len(), 1);

        exec.internal_transition(Time::new(3.0)).unwrap();
        assert!(exec.changes().is_empty());
    }
}
