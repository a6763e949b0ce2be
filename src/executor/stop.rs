//! Stopping-condition evaluation
//!
//! Count mode stops once `requested + skip` iterations completed. Duration mode
//! measures from the send timestamp of iteration `skip`, so the warm-up window
//! never eats into the requested run length.

use crate::clock::{Nanos, Timestamp};
use crate::models::Termination;

#[derive(Debug, Clone)]
pub struct StopCondition {
    termination: Termination,
    skip: u64,
    start: Option<Timestamp>,
}

impl StopCondition {
    pub fn new(termination: Termination, skip: u64) -> Self {
        Self {
            termination,
            skip,
            start: None,
        }
    }

    /// Note the send time of iteration `index`; the first reported send
    /// starts the duration clock
    #[inline]
    pub fn observe_send(&mut self, index: u64, at: Timestamp) {
        if index == self.skip && self.start.is_none() {
            self.start = Some(at);
        }
    }

    /// Whether the loop ends before starting another iteration
    #[inline]
    pub fn should_stop(&self, completed: u64, now: Timestamp) -> bool {
        match self.termination {
            Termination::Iterations(requested) => completed >= requested.saturating_add(self.skip),
            Termination::Duration(length) => match self.start {
                Some(start) => now - start >= length,
                None => false,
            },
        }
    }

    /// Send timestamp of the first reported iteration, once it happened
    pub fn start(&self) -> Option<Timestamp> {
        self.start
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Time measured so far against the duration limit
    pub fn elapsed(&self, now: Timestamp) -> Nanos {
        self.start.map_or(Nanos::ZERO, |start| now - start)
    }
}
