//! The control loop.
//!
//! One tick runs every task whose interval has elapsed, in a fixed order, and
//! hands a fresh [`DisplayState`] to the renderer. Ticks never block on
//! anything but genuine network work, and a failing tick only costs a short
//! backoff before the next one.

use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::connectivity::{Connectivity, Link};
use crate::display::{DisplayState, Render};
use crate::interval::{IntervalTimer, MonoMs};
use crate::weather::WeatherFetcher;

const FAILURE_WARN_EVERY: u32 = 10;

/// Source of monotonic time plus the ability to wait on it.
pub trait Monotonic {
    fn now_ms(&self) -> MonoMs;
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock-independent time since construction.
pub struct SystemMonotonic {
    start: Instant,
}

impl SystemMonotonic {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemMonotonic {
    fn default() -> Self {
        Self::new()
    }
}

impl Monotonic for SystemMonotonic {
    fn now_ms(&self) -> MonoMs {
        self.start.elapsed().as_millis() as MonoMs
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct Scheduler<L: Link, R: Render> {
    connectivity: Connectivity<L>,
    clock: Clock,
    weather: WeatherFetcher,
    renderer: R,
    blink: IntervalTimer,
    blink_on: bool,
    first_fetch: bool,
    display: Option<DisplayState>,
    tick_yield: Duration,
    error_backoff: Duration,
    failures: u32,
}

impl<L: Link, R: Render> Scheduler<L, R> {
    pub fn new(config: &Config, link: L, renderer: R, now: MonoMs) -> Self {
        let iv = &config.intervals;
        Self {
            connectivity: Connectivity::new(link, config.credentials.clone(), iv),
            clock: Clock::new(iv.ntp_sync, config.tz_offset_hours),
            weather: WeatherFetcher::new(config.weather_url.clone(), iv.weather_check),
            renderer,
            blink: IntervalTimer::armed(iv.blink, now),
            blink_on: true,
            first_fetch: true,
            display: None,
            tick_yield: config.tick_yield,
            error_backoff: config.error_backoff,
            failures: 0,
        }
    }

    /// One pass of the control loop at monotonic time `now`.
    ///
    /// Only the renderer can fail a tick; every other component reports
    /// trouble through its return value and keeps its last good data.
    pub fn tick(&mut self, now: MonoMs) -> Result<()> {
        self.connectivity.ensure_connected(now);

        let reading = self.clock.now(now, self.connectivity.time_source());

        if reading.is_some() && self.blink.try_fire(now) {
            self.blink_on = !self.blink_on;
        }

        let force = self.first_fetch && self.connectivity.is_connected();
        let outcome =
            self.weather
                .maybe_refresh(force, now, &mut self.connectivity, reading.as_ref());
        if outcome.attempted() {
            if self.first_fetch {
                info!("Initial weather fetch done: {:?}", outcome);
            }
            self.first_fetch = false;
        }

        let state = DisplayState::project(reading.as_ref(), self.weather.reading(), self.blink_on);
        let rendered = self.renderer.render(&state);
        self.display = Some(state);
        rendered
    }

    /// Tick forever, yielding between ticks and backing off after a failure.
    pub fn run<M: Monotonic>(&mut self, mono: &mut M) -> ! {
        info!("Entering main loop");
        loop {
            match self.tick(mono.now_ms()) {
                Ok(()) => {
                    if self.failures > 0 {
                        info!("Tick recovered after {} failure(s)", self.failures);
                        self.failures = 0;
                    }
                    mono.sleep(self.tick_yield);
                }
                Err(e) => {
                    self.failures = self.failures.saturating_add(1);
                    if self.failures == 1 || self.failures.is_multiple_of(FAILURE_WARN_EVERY) {
                        warn!("Tick failed ({} consecutive): {:#}", self.failures, e);
                    } else {
                        debug!("Tick failed ({} consecutive)", self.failures);
                    }
                    mono.sleep(self.error_backoff);
                }
            }
        }
    }

    pub fn connectivity(&self) -> &Connectivity<L> {
        &self.connectivity
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn weather(&self) -> &WeatherFetcher {
        &self.weather
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    /// True until a weather request has actually been issued.
    pub fn first_fetch_pending(&self) -> bool {
        self.first_fetch
    }

    /// The snapshot produced by the most recent tick.
    pub fn display(&self) -> Option<&DisplayState> {
        self.display.as_ref()
    }
}

/// Last resort for a boot that could not reach the loop: log, wait out the
/// cooldown, restart.
pub fn fatal_recovery<M: Monotonic>(
    err: &anyhow::Error,
    cooldown: Duration,
    mono: &mut M,
    restart: fn() -> !,
) -> ! {
    error!("Fatal: {:#}", err);
    error!("Restarting in {}s", cooldown.as_secs());
    mono.sleep(cooldown);
    restart()
}
