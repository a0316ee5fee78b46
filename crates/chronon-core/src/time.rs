//! The simulation clock value type.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A point on the virtual clock, or a duration between two points.
///
/// Wraps an `f64` with a *total* order (`f64::total_cmp`), so `Time` can
/// key priority structures directly. Two sentinels bound the axis:
/// [`Time::INFINITY`] ("never scheduled") and [`Time::NEG_INFINITY`]
/// (the lower bound used by some default states). The original notion of
/// a "nil" time is not represented here; absent times are `Option<Time>`.
///
/// A `Time` never holds a NaN: [`Time::new`] rejects it in debug builds,
/// [`Time::checked`] rejects it at runtime, and the arithmetic below
/// saturates the one case (`INFINITY + NEG_INFINITY`) that would
/// otherwise produce one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Time(f64);

impl Time {
    /// The zero point of the clock.
    pub const ZERO: Time = Time(0.0);

    /// Upper sentinel: an event that will never occur.
    pub const INFINITY: Time = Time(f64::INFINITY);

    /// Lower sentinel: before every finite time.
    pub const NEG_INFINITY: Time = Time(f64::NEG_INFINITY);

    /// Construct from a raw `f64`.
    ///
    /// Debug builds reject NaN; release builds trust the caller. Use
    /// [`Time::checked`] for untrusted input.
    pub fn new(value: f64) -> Time {
        debug_assert!(!value.is_nan(), "Time cannot hold NaN");
        Time(value)
    }

    /// Construct from untrusted input, returning `None` for NaN.
    pub fn checked(value: f64) -> Option<Time> {
        if value.is_nan() {
            None
        } else {
            Some(Time(value))
        }
    }

    /// The raw clock value.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// `true` for the [`Time::INFINITY`] sentinel.
    pub fn is_infinity(self) -> bool {
        self.0 == f64::INFINITY
    }

    /// `true` for the [`Time::NEG_INFINITY`] sentinel.
    pub fn is_neg_infinity(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    /// `true` when neither sentinel.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// `true` for strictly negative values (including the lower sentinel).
    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == std::cmp::Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Time {
    type Output = Time;

    /// Point-plus-duration addition.
    ///
    /// Opposite infinities saturate to the left operand instead of NaN;
    /// the point dominates the duration.
    fn add(self, rhs: Time) -> Time {
        let raw = self.0 + rhs.0;
        if raw.is_nan() {
            self
        } else {
            Time(raw)
        }
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Time;

    /// Difference of two points. Equal infinities saturate to the left
    /// operand instead of NaN.
    fn sub(self, rhs: Time) -> Time {
        let raw = self.0 - rhs.0;
        if raw.is_nan() {
            self
        } else {
            Time(raw)
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            write!(f, "+inf")
        } else if self.is_neg_infinity() {
            write!(f, "-inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
