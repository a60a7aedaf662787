//! Interval gates.
//!
//! Every periodic task in the control loop (blink, weather, time sync,
//! reconnect) decides whether it may run by comparing elapsed monotonic time
//! against a configured period. The comparison lives here as a pure function
//! so the scheduler can be exercised without real time passing.

use std::time::Duration;

/// Milliseconds since boot, from a monotonic source.
pub type MonoMs = u64;

/// True when `interval` has elapsed since `last_fired`.
///
/// A task that has never fired is always due. A `now` earlier than
/// `last_fired` (should not happen with a monotonic source) is treated as
/// "not elapsed".
pub fn is_due(now: MonoMs, last_fired: Option<MonoMs>, interval: Duration) -> bool {
    match last_fired {
        None => true,
        Some(last) => now.saturating_sub(last) >= interval.as_millis() as u64,
    }
}

/// A named period plus the time its task last actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    interval: Duration,
    last_fired: Option<MonoMs>,
}

impl IntervalTimer {
    /// Timer that is due immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Timer whose first period starts at `now`.
    pub fn armed(interval: Duration, now: MonoMs) -> Self {
        Self {
            interval,
            last_fired: Some(now),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_fired(&self) -> Option<MonoMs> {
        self.last_fired
    }

    pub fn is_due(&self, now: MonoMs) -> bool {
        is_due(now, self.last_fired, self.interval)
    }

    /// Record that the task ran at `now`. `last_fired` never moves backwards.
    pub fn fire(&mut self, now: MonoMs) {
        self.last_fired = Some(match self.last_fired {
            Some(last) => last.max(now),
            None => now,
        });
    }

    /// Fire if due, returning whether it did.
    pub fn try_fire(&mut self, now: MonoMs) -> bool {
        if self.is_due(now) {
            self.fire(now);
            true
        } else {
            false
        }
    }
}
