//! Local time of day, fed by an unreliable network time source.
//!
//! The clock keeps the last successful sync as an anchor and extrapolates
//! from it with the monotonic timer, so a stale sync still tells the time.
//! Nothing is reported until the first sync succeeds.

use std::time::Duration;

use anyhow::Result;
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use log::{debug, info, warn};

use crate::interval::{is_due, MonoMs};

const FAILURE_WARN_EVERY: u32 = 10;

/// A wall-clock reading in local time. `weekday` is 0 for Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub weekday: u8,
}

impl ClockReading {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            weekday: dt.weekday().num_days_from_monday() as u8,
        }
    }
}

/// External time authority (SNTP on the device). Returns UTC.
pub trait TimeSource {
    fn sync(&mut self) -> Result<NaiveDateTime>;
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    local: NaiveDateTime,
    at: MonoMs,
}

pub struct Clock {
    sync_interval: Duration,
    utc_offset: TimeDelta,
    anchor: Option<Anchor>,
    last_sync: Option<MonoMs>,
    failures: u32,
}

impl Clock {
    pub fn new(sync_interval: Duration, tz_offset_hours: i32) -> Self {
        Self {
            sync_interval,
            utc_offset: TimeDelta::hours(i64::from(tz_offset_hours)),
            anchor: None,
            last_sync: None,
            failures: 0,
        }
    }

    /// Monotonic time of the last successful sync.
    pub fn last_sync(&self) -> Option<MonoMs> {
        self.last_sync
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Current local time, resyncing first when the sync interval has
    /// elapsed and a source is reachable.
    ///
    /// A failed resync keeps the previous anchor and leaves `last_sync`
    /// alone, so the next call tries again.
    pub fn now(&mut self, now: MonoMs, source: Option<&mut dyn TimeSource>) -> Option<ClockReading> {
        if let Some(source) = source {
            if is_due(now, self.last_sync, self.sync_interval) {
                self.resync(now, source);
            }
        }
        self.reading_at(now)
    }

    /// Reading extrapolated from the anchor, without touching the source.
    pub fn reading_at(&self, now: MonoMs) -> Option<ClockReading> {
        let anchor = self.anchor?;
        let elapsed = TimeDelta::milliseconds(now.saturating_sub(anchor.at) as i64);
        Some(ClockReading::from_datetime(&(anchor.local + elapsed)))
    }

    fn resync(&mut self, now: MonoMs, source: &mut dyn TimeSource) {
        match source.sync() {
            Ok(utc) => {
                let local = utc + self.utc_offset;
                if self.anchor.is_none() || self.failures > 0 {
                    info!("Clock synced: {}", local.format("%Y-%m-%d %H:%M:%S"));
                } else {
                    debug!("Clock resynced: {}", local.format("%Y-%m-%d %H:%M:%S"));
                }
                self.anchor = Some(Anchor { local, at: now });
                self.last_sync = Some(now);
                self.failures = 0;
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 || self.failures.is_multiple_of(FAILURE_WARN_EVERY) {
                    warn!("Time sync failed ({} consecutive): {}", self.failures, e);
                } else {
                    debug!("Time sync failed ({} consecutive)", self.failures);
                }
            }
        }
    }
}
