//! Elapsed-Time Timers
//!
//! Timers are plain counters advanced by the simulation's delta time.
//! A stopped timer has no elapsed value.

use serde::{Deserialize, Serialize};

/// A periodic timer driven by explicit `advance` calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    /// Length of one period in seconds
    pub period: f32,
    elapsed: Option<f32>,
}

impl Timer {
    /// Create a stopped timer.
    pub const fn new(period: f32) -> Self {
        Self { period, elapsed: None }
    }

    /// Create a timer that is already running from zero.
    pub const fn started(period: f32) -> Self {
        Self { period, elapsed: Some(0.0) }
    }

    /// (Re)start from zero.
    pub fn start(&mut self) {
        self.elapsed = Some(0.0);
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.elapsed.is_some()
    }

    /// Seconds since start, or 0 when stopped.
    pub fn elapsed(&self) -> f32 {
        self.elapsed.unwrap_or(0.0)
    }

    /// Advance a running timer by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if let Some(elapsed) = self.elapsed.as_mut() {
            *elapsed += dt;
        }
    }

    /// Whether at least one full period has elapsed.
    pub fn has_period_elapsed(&self) -> bool {
        matches!(self.elapsed, Some(e) if e >= self.period)
    }

    /// Consume one elapsed period. Returns true if one was available.
    ///
    /// Calling this in a loop yields one `true` per banked period.
    pub fn decrement_period_if_elapsed(&mut self) -> bool {
        match self.elapsed.as_mut() {
            Some(e) if *e >= self.period && self.period > 0.0 => {
                *e -= self.period;
                true
            }
            _ => false,
        }
    }

    /// Cap banked time at one period.
    pub fn clamp_to_period(&mut self) {
        if let Some(e) = self.elapsed.as_mut() {
            *e = e.min(self.period.max(0.0));
        }
    }
}
