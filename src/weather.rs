use anyhow::Result;
use log::{debug, info, warn};

use crate::clock::ClockReading;
use crate::connectivity::{Connectivity, Link, Session};
use crate::feed;
use crate::forecast::{ForecastEntry, ForecastSelector};
use crate::interval::{IntervalTimer, MonoMs};

const FAILURE_WARN_EVERY: u32 = 10;

/// The forecast for the current hour, stamped with when it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub entry: ForecastEntry,
    pub fetched_at: MonoMs,
}

/// What a call to [`WeatherFetcher::maybe_refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Interval has not elapsed and no force was requested.
    NotDue,
    /// No link; the timer was left alone.
    Offline,
    /// The clock has never synced, so there is no hour to look up.
    TimeUnknown,
    /// A matching entry replaced the stored reading.
    Updated,
    /// The feed was read but had no entry for this hour.
    NoMatch,
    /// Request or decoding failed; the previous reading stays.
    Failed,
}

impl RefreshOutcome {
    /// True when a request was actually issued.
    pub fn attempted(self) -> bool {
        matches!(
            self,
            RefreshOutcome::Updated | RefreshOutcome::NoMatch | RefreshOutcome::Failed
        )
    }
}

pub struct WeatherFetcher {
    url: String,
    timer: IntervalTimer,
    reading: Option<WeatherReading>,
    failures: u32,
}

impl WeatherFetcher {
    pub fn new(url: impl Into<String>, check_interval: std::time::Duration) -> Self {
        Self {
            url: url.into(),
            timer: IntervalTimer::new(check_interval),
            reading: None,
            failures: 0,
        }
    }

    pub fn reading(&self) -> Option<&WeatherReading> {
        self.reading.as_ref()
    }

    /// Monotonic time the last request completed, successful or not.
    pub fn last_fetch(&self) -> Option<MonoMs> {
        self.timer.last_fired()
    }

    /// Fetch the forecast for the current hour if one is due.
    ///
    /// Skipping for lack of a link or a clock does not touch the timer, so
    /// the next tick retries. A request that completes, either way, restarts
    /// the interval.
    pub fn maybe_refresh<L: Link>(
        &mut self,
        force: bool,
        now: MonoMs,
        net: &mut Connectivity<L>,
        clock: Option<&ClockReading>,
    ) -> RefreshOutcome {
        if !force && !self.timer.is_due(now) {
            return RefreshOutcome::NotDue;
        }
        if !net.ensure_connected(now) {
            return RefreshOutcome::Offline;
        }
        let Some(selector) = clock.and_then(ForecastSelector::for_reading) else {
            debug!("Weather refresh skipped: clock not set");
            return RefreshOutcome::TimeUnknown;
        };
        let Some(session) = net.session_mut() else {
            return RefreshOutcome::Offline;
        };

        info!("Fetching weather for {:?}...", selector.key());
        let result = fetch_current(session, &self.url, selector);
        self.timer.fire(now);

        match result {
            Ok(Some(entry)) => {
                info!(
                    "Weather: {:.1}°C feels {:.1}°C {}",
                    entry.temperature, entry.feels_like, entry.condition
                );
                self.failures = 0;
                self.reading = Some(WeatherReading {
                    entry,
                    fetched_at: now,
                });
                RefreshOutcome::Updated
            }
            Ok(None) => {
                warn!("Weather feed has no entry for the current hour");
                self.failures = 0;
                RefreshOutcome::NoMatch
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 || self.failures.is_multiple_of(FAILURE_WARN_EVERY) {
                    warn!("Weather fetch failed ({} consecutive): {:#}", self.failures, e);
                } else {
                    debug!("Weather fetch failed ({} consecutive)", self.failures);
                }
                RefreshOutcome::Failed
            }
        }
    }
}

fn fetch_current<S: Session>(
    session: &mut S,
    url: &str,
    mut selector: ForecastSelector,
) -> Result<Option<ForecastEntry>> {
    let body = session.get(url)?;
    let summary = feed::scan(body, |record| match record {
        Ok(entry) => selector.offer(&entry),
        Err(e) => {
            debug!("Skipping forecast record: {}", e);
            std::ops::ControlFlow::Continue(())
        }
    })?;
    if summary.rejected > 0 {
        warn!(
            "Weather feed: {} of {} records unreadable",
            summary.rejected, summary.records
        );
    }
    Ok(selector.into_match())
}
