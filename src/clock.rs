//! Monotonic timestamps and nanosecond arithmetic
//!
//! Every timestamp the engine records comes from a [`Clock`]. Timestamps are
//! nanosecond offsets from a clock-local base, so differences between two
//! readings of the same clock are exact integers and can be negative.

use crate::types::TimeUnit;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A point in time, in nanoseconds since the owning clock's base
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }
}

/// Signed duration in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Nanos(i64);

impl Nanos {
    pub const ZERO: Nanos = Nanos(0);

    pub fn new(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_micros(micros: u64) -> Self {
        Self((micros as i64).saturating_mul(1_000))
    }

    /// Whole nanoseconds of a fractional second count
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9).round() as i64)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// True when the left operand of the subtraction preceded the right one
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Convert to a fractional value in the given unit
    pub fn to_unit(&self, unit: TimeUnit) -> f64 {
        self.0 as f64 / unit.nanos_per_unit()
    }

    /// Absolute value as a std duration
    pub fn to_std(&self) -> Duration {
        Duration::from_nanos(self.0.unsigned_abs())
    }
}

impl Sub for Timestamp {
    type Output = Nanos;

    fn sub(self, rhs: Timestamp) -> Nanos {
        Nanos(self.0 - rhs.0)
    }
}

impl Add<Nanos> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Nanos) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl Add for Nanos {
    type Output = Nanos;

    fn add(self, rhs: Nanos) -> Nanos {
        Nanos(self.0 + rhs.0)
    }
}

impl Sub for Nanos {
    type Output = Nanos;

    fn sub(self, rhs: Nanos) -> Nanos {
        Nanos(self.0 - rhs.0)
    }
}

impl From<Duration> for Nanos {
    fn from(duration: Duration) -> Self {
        Nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Clock backed by the platform monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    base: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { base: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Timestamp(Nanos::from(self.base.elapsed()).get())
    }
}

/// Deterministic clock for tests and simulations.
///
/// Each read returns the current value and then moves the clock forward by
/// `step`, so a busy-poll loop observes time passing at a fixed rate.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
    step: i64,
}

impl ManualClock {
    pub fn new(start: Timestamp, step: Nanos) -> Self {
        Self {
            now: AtomicI64::new(start.as_nanos()),
            step: step.get(),
        }
    }

    /// Clock that only moves when advanced explicitly
    pub fn frozen(start: Timestamp) -> Self {
        Self::new(start, Nanos::ZERO)
    }

    pub fn advance(&self, by: Nanos) {
        self.now.fetch_add(by.get(), Ordering::SeqCst);
    }

    /// Current value without advancing
    pub fn peek(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.fetch_add(self.step, Ordering::SeqCst))
    }
}
