//! Bucket-based send pacing
//!
//! The controller banks elapsed time. An iteration is due once the bank holds
//! at least one interval; the caller then drains exactly one interval, keeping
//! any remainder, so late polls are paid back by the following sends and the
//! long-run send rate stays at one per interval.

use crate::clock::Nanos;

#[derive(Debug, Clone)]
pub struct PacingController {
    interval_ns: i64,
    bucket_ns: i64,
}

impl PacingController {
    /// Controller for the given inter-send interval. Zero means unthrottled.
    pub fn new(interval: Nanos) -> Self {
        let interval_ns = interval.get().max(0);
        Self {
            interval_ns,
            bucket_ns: interval_ns,
        }
    }

    pub fn unthrottled() -> Self {
        Self::new(Nanos::ZERO)
    }

    pub fn interval(&self) -> Nanos {
        Nanos::new(self.interval_ns)
    }

    pub fn is_unthrottled(&self) -> bool {
        self.interval_ns == 0
    }

    /// Bank the time elapsed since the previous poll
    #[inline]
    pub fn accumulate(&mut self, elapsed: Nanos) {
        self.bucket_ns += elapsed.get();
    }

    #[inline]
    pub fn is_due(&self) -> bool {
        self.bucket_ns >= self.interval_ns
    }

    /// Spend one interval after a due iteration was performed
    #[inline]
    pub fn drain(&mut self) {
        self.bucket_ns -= self.interval_ns;
    }

    /// Accumulate and report whether an iteration is due
    #[inline]
    pub fn poll(&mut self, elapsed: Nanos) -> bool {
        self.accumulate(elapsed);
        self.is_due()
    }

    pub fn banked(&self) -> Nanos {
        Nanos::new(self.bucket_ns)
    }
}
