//! Event types exchanged between models and views.
//!
//! Three kinds of event drive a simulation. *Internal* events are a
//! model's own scheduled time-advance expiring; they live as scheduler
//! entries and have no struct here. *External* events carry a payload
//! from one model's output port to another model's input port.
//! *Observation* events ask a model to sample a port for a view.
//!
//! Events are ordered primarily by time. At an equal time the step
//! protocol fixes the kind order (transitions before observation) and
//! stable insertion order fixes the order among entries of one kind.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::id::SimulatorId;
use crate::time::Time;
use crate::value::Value;

/// Named attribute bag attached to an [`ExternalEvent`].
///
/// Insertion-ordered so payload iteration is reproducible.
pub type Attributes = IndexMap<String, Value>;

/// A port-carried event from one model's output to another's input.
///
/// Dynamics create these in their output function naming only the port;
/// the simulator stamps `source` and routing resolves `target`. Cloned
/// per destination when a port fans out.
///
/// # Examples
///
/// ```
/// use chronon_core::ExternalEvent;
///
/// let ev = ExternalEvent::new("out").with_attribute("level", 3i64);
/// assert_eq!(ev.port(), "out");
/// assert_eq!(ev.attribute("level").and_then(|v| v.as_integer()), Some(3));
/// assert_eq!(ev.attribute("missing"), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalEvent {
    port: String,
    source: Option<SimulatorId>,
    target: Option<SimulatorId>,
    attributes: Attributes,
}

impl ExternalEvent {
    /// A new event on `port` with an empty attribute bag.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            source: None,
            target: None,
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute attachment.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Insert or replace an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The whole attribute bag, in insertion order.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The port this event was emitted on (source side) or delivered to
    /// (target side, after routing rewrites it).
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The emitting simulator; `None` for exogenous events.
    pub fn source(&self) -> Option<SimulatorId> {
        self.source
    }

    /// The destination simulator, resolved during routing.
    pub fn target(&self) -> Option<SimulatorId> {
        self.target
    }

    /// Stamp the emitting simulator. Called once by the simulator
    /// wrapper when collecting outputs.
    pub fn set_source(&mut self, source: SimulatorId) {
        self.source = Some(source);
    }

    /// Rebind the event to a concrete destination, rewriting the port to
    /// the destination's input port. Used by routing when cloning the
    /// event per fan-out target.
    pub fn retarget(&self, target: SimulatorId, port: impl Into<String>) -> ExternalEvent {
        ExternalEvent {
            port: port.into(),
            source: self.source,
            target: Some(target),
            attributes: self.attributes.clone(),
        }
    }
}

/// An ordered list of [`ExternalEvent`]s.
///
/// The common case (a model emitting one or two events per transition)
/// stays inline; larger bursts spill to the heap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalEventList(SmallVec<[ExternalEvent; 4]>);

impl ExternalEventList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: ExternalEvent) {
        self.0.push(event);
    }

    /// Convenience: append a payload-less event on `port`.
    pub fn emit(&mut self, port: impl Into<String>) {
        self.0.push(ExternalEvent::new(port));
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no events are queued.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExternalEvent> {
        self.0.iter()
    }

    /// Mutable iteration in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ExternalEvent> {
        self.0.iter_mut()
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl IntoIterator for ExternalEventList {
    type Item = ExternalEvent;
    type IntoIter = smallvec::IntoIter<[ExternalEvent; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExternalEventList {
    type Item = &'a ExternalEvent;
    type IntoIter = std::slice::Iter<'a, ExternalEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ExternalEvent> for ExternalEventList {
    fn from_iter<I: IntoIterator<Item = ExternalEvent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<ExternalEvent> for ExternalEventList {
    fn extend<I: IntoIterator<Item = ExternalEvent>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// A view's request to sample one port of a model at a given time.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationEvent {
    view: String,
    port: String,
    time: Time,
}

impl ObservationEvent {
    /// A sampling request from `view` for `port` at `time`.
    pub fn new(view: impl Into<String>, port: impl Into<String>, time: Time) -> Self {
        Self {
            view: view.into(),
            port: port.into(),
            time,
        }
    }

    /// The requesting view's name.
    pub fn view(&self) -> &str {
        &self.view
    }

    /// The port to sample.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The sampling instant.
    pub fn time(&self) -> Time {
        self.time
    }

    /// `true` when this request targets `port` — the usual guard at the
    /// top of an observation callback.
    pub fn on_port(&self, port: &str) -> bool {
        self.port == port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retarget_clones_payload_and_rewrites_port() {
        let mut ev = ExternalEvent::new("out").with_attribute("x", 1.0);
        ev.set_source(SimulatorId(3));

        let delivered = ev.retarget(SimulatorId(9), "in");
        assert_eq!(delivered.port(), "in");
        assert_eq!(delivered.source(), Some(SimulatorId(3)));
        assert_eq!(delivered.target(), Some(SimulatorId(9)));
        assert_eq!(delivered.attribute("x"), Some(&Value::Double(1.0)));
        // The original is untouched.
        assert_eq!(ev.port(), "out");
        assert_eq!(ev.target(), None);
    }

    #[test]
    fn event_list_keeps_insertion_order() {
        let mut list = ExternalEventList::new();
        list.emit("a");
        list.emit("b");
        list.push(ExternalEvent::new("c"));

        let ports: Vec<&str> = list.iter().map(|e| e.port()).collect();
        assert_eq!(ports, ["a", "b", "c"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn observation_event_port_guard() {
        let ev = ObservationEvent::new("stats", "count", Time::new(2.0));
        assert!(ev.on_port("count"));
        assert!(!ev.on_port("level"));
        assert_eq!(ev.time(), Time::new(2.0));
    }
}
