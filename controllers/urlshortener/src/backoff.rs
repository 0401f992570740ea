//! # Fibonacci Backoff
//!
//! Requeue delays for objects whose reconciliation keeps failing.
//! Sequence in minutes: 1, 1, 2, 3, 5, 8, then capped at 10.
//! Delays are tracked per object and reset once a reconciliation succeeds.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Calculations are performed in minutes, then converted to a `Duration`.
/// Each backoff is the sum of the previous two, capped at `max_minutes`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// # Arguments
    ///
    /// * `min_minutes` - First two delays (typically 1)
    /// * `max_minutes` - Upper bound of the sequence (typically 10)
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current delay; advances the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);
        delay
    }

    /// Restart the sequence from `min_minutes`
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

#[derive(Debug, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Backoff state per object key (`kind/namespace/name`)
#[derive(Debug, Default)]
pub struct BackoffRegistry {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffRegistry {
    /// Record a failure for `key`; returns the requeue delay and the number
    /// of consecutive failures so far
    pub fn record_failure(&self, key: &str) -> (Duration, u32) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(key.to_string()).or_default();
        state.error_count += 1;
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget failures for `key` after a successful reconciliation
    pub fn reset(&self, key: &str) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(key);
    }

    /// Consecutive failures currently recorded for `key`
    pub fn error_count(&self, key: &str) -> u32 {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(key).map_or(0, |s| s.error_count)
    }
}
