//! The event-time priority structure.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use smallvec::SmallVec;

use chronon_core::{ScheduleError, SimulatorId, Time};

/// The imminent set of one step: every simulator at the minimum time.
///
/// Small populations stay inline; mass-simultaneity spills to the heap.
pub type ImminentSet = SmallVec<[SimulatorId; 4]>;

/// A heap entry. Ordered by `(time, seq)`, so equal-time entries pop in
/// insertion order — the documented deterministic tie-break for
/// simultaneous events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    time: Time,
    seq: u64,
    simulator: SimulatorId,
}

/// Time-ordered structure over every simulator's next internal event.
///
/// A binary min-heap with lazy invalidation: each insert supersedes the
/// simulator's previous entry by bumping its live sequence number, and
/// stale heap entries are skipped when they surface. This gives
/// O(log n) insert/update, O(1) amortized removal, and a peek that is
/// exact after stale-entry cleanup.
///
/// The causality guard: inserts earlier than the scheduler's clock are
/// rejected. The clock starts at the experiment begin (so the global
/// init pass schedules freely) and is advanced by the coordinator at
/// the start of every step.
#[derive(Debug)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<Entry>>,
    live: HashMap<SimulatorId, (Time, u64)>,
    clock: Time,
    next_seq: u64,
}

impl Scheduler {
    /// A new, empty scheduler with its causality clock at `clock`.
    pub fn new(clock: Time) -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            clock,
            next_seq: 0,
        }
    }

    /// The causality clock.
    pub fn clock(&self) -> Time {
        self.clock
    }

    /// Number of simulators currently scheduled.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// `true` when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Schedule (or reschedule) `simulator` at `time`.
    ///
    /// A previous entry for the same simulator is superseded. Fails
    /// when `time` is before the clock — scheduling into the past would
    /// break causality.
    pub fn insert(&mut self, simulator: SimulatorId, time: Time) -> Result<(), ScheduleError> {
        if time < self.clock {
            return Err(ScheduleError::TimeUnderflow {
                scheduled: time,
                clock: self.clock,
            });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(simulator, (time, seq));
        self.heap.push(Reverse(Entry {
            time,
            seq,
            simulator,
        }));
        Ok(())
    }

    /// Forget `simulator` entirely. Silent no-op when it is not
    /// scheduled (it may already have been extracted this step).
    pub fn remove(&mut self, simulator: SimulatorId) {
        self.live.remove(&simulator);
    }

    /// Advance the causality clock. Coordinator only, once per step.
    pub fn advance_to(&mut self, time: Time) {
        debug_assert!(time >= self.clock, "clock must not move backwards");
        self.clock = time;
    }

    /// The minimum scheduled time, or [`Time::INFINITY`] when empty.
    pub fn peek_min_time(&mut self) -> Time {
        self.drop_stale();
        match self.heap.peek() {
            Some(Reverse(entry)) => entry.time,
            None => Time::INFINITY,
        }
    }

    /// Extract every simulator scheduled at the minimum time, in
    /// insertion order. The entries are removed; the caller re-inserts
    /// after the transitions.
    pub fn extract_imminent(&mut self) -> ImminentSet {
        let mut imminent = ImminentSet::new();
        let min_time = self.peek_min_time();
        if min_time.is_infinity() {
            return imminent;
        }
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.time != min_time {
                break;
            }
            let entry = self.heap.pop().expect("peeked entry exists").0;
            if self.is_live(&entry) {
                self.live.remove(&entry.simulator);
                imminent.push(entry.simulator);
            }
        }
        imminent
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.live.get(&entry.simulator) == Some(&(entry.time, entry.seq))
    }

    /// Pop superseded and removed entries off the top of the heap.
    fn drop_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(n: u32) -> SimulatorId {
        SimulatorId(n)
    }

    #[test]
    fn empty_scheduler_peeks_infinity() {
        let mut s = Scheduler::new(Time::ZERO);
        assert_eq!(s.peek_min_time(), Time::INFINITY);
        assert!(s.extract_imminent().is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn extracts_all_entries_tied_at_the_minimum() {
        let mut s = Scheduler::new(Time::ZERO);
        s.insert(sim(1), Time::new(2.0)).unwrap();
        s.insert(sim(2), Time::new(1.0)).unwrap();
        s.insert(sim(3), Time::new(1.0)).unwrap();

        assert_eq!(s.peek_min_time(), Time::new(1.0));
        let imminent = s.extract_imminent();
        // Insertion order among the tied entries.
        assert_eq!(imminent.as_slice(), &[sim(2), sim(3)]);
        assert_eq!(s.peek_min_time(), Time::new(2.0));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn reinsert_supersedes_the_old_entry() {
        let mut s = Scheduler::new(Time::ZERO);
        s.insert(sim(1), Time::new(5.0)).unwrap();
        s.insert(sim(1), Time::new(3.0)).unwrap();

        assert_eq!(s.peek_min_time(), Time::new(3.0));
        assert_eq!(s.extract_imminent().as_slice(), &[sim(1)]);
        // The superseded 5.0 entry must not resurface.
        assert_eq!(s.peek_min_time(), Time::INFINITY);
    }

    #[test]
    fn remove_is_a_silent_noop_when_absent() {
        let mut s = Scheduler::new(Time::ZERO);
        s.remove(sim(7));
        s.insert(sim(1), Time::new(1.0)).unwrap();
        s.extract_imminent();
        // Already extracted this step: still a no-op.
        s.remove(sim(1));
        assert_eq!(s.peek_min_time(), Time::INFINITY);
    }

    #[test]
    fn removed_simulator_never_surfaces() {
        let mut s = Scheduler::new(Time::ZERO);
        s.insert(sim(1), Time::new(1.0)).unwrap();
        s.insert(sim(2), Time::new(1.0)).unwrap();
        s.remove(sim(1));
        assert_eq!(s.extract_imminent().as_slice(), &[sim(2)]);
    }

    #[test]
    fn causality_guard_rejects_the_past() {
        let mut s = Scheduler::new(Time::ZERO);
        s.advance_to(Time::new(2.0));
        let err = s.insert(sim(1), Time::new(1.0)).unwrap_err();
        assert!(matches!(err, ScheduleError::TimeUnderflow { .. }));
        // Exactly at the clock is allowed (zero time-advance).
        s.insert(sim(1), Time::new(2.0)).unwrap();
    }

    #[test]
    fn infinity_entries_sort_last() {
        let mut s = Scheduler::new(Time::ZERO);
        s.insert(sim(1), Time::INFINITY).unwrap();
        s.insert(sim(2), Time::new(4.0)).unwrap();
        assert_eq!(s.peek_min_time(), Time::new(4.0));
    }

    // ── proptest ───────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Draining the scheduler yields non-decreasing times, and
            /// equal-time batches preserve insertion order.
            #[test]
            fn drain_is_time_ordered_and_fifo_within_ties(
                times in prop::collection::vec(0u32..8, 1..64)
            ) {
                let mut s = Scheduler::new(Time::ZERO);
                for (i, &t) in times.iter().enumerate() {
                    s.insert(SimulatorId(i as u32), Time::new(f64::from(t))).unwrap();
                }

                let mut last_time = Time::NEG_INFINITY;
                let mut drained = 0usize;
                loop {
                    let t = s.peek_min_time();
                    if t.is_infinity() {
                        break;
                    }
                    prop_assert!(t >= last_time);
                    let batch = s.extract_imminent();
                    prop_assert!(!batch.is_empty());
                    // Within a batch, ids ascend because insertion order
                    // followed id order.
                    for pair in batch.windows(2) {
                        prop_assert!(pair[0] < pair[1]);
                    }
                    drained += batch.len();
                    last_time = t;
                }
                prop_assert_eq!(drained, times.len());
            }

            /// After an arbitrary mix of inserts, updates, and removals,
            /// every simulator surfaces at most once, at its final time.
            #[test]
            fn supersede_and_remove_never_leak(
                ops in prop::collection::vec((0u32..8, 0u32..8, prop::bool::ANY), 0..64)
            ) {
                let mut s = Scheduler::new(Time::ZERO);
                let mut expected: std::collections::HashMap<SimulatorId, Time> =
                    std::collections::HashMap::new();
                for &(id, t, remove) in &ops {
                    let id = SimulatorId(id);
                    if remove {
                        s.remove(id);
                        expected.remove(&id);
                    } else {
                        let t = Time::new(f64::from(t));
                        s.insert(id, t).unwrap();
                        expected.insert(id, t);
                    }
                }

                let mut seen = std::collections::HashMap::new();
                loop {
                    let t = s.peek_min_time();
                    if t.is_infinity() {
                        break;
                    }
                    for id in s.extract_imminent() {
                        prop_assert!(seen.insert(id, t).is_none());
                    }
                }
                prop_assert_eq!(seen, expected);
            }
        }
    }
}
