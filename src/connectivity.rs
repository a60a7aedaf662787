//! Link state and the resources that only exist while the link is up.
//!
//! `Connectivity` is the single owner of the HTTP session and the time-sync
//! client. Both are rebuilt on every reconnect and dropped on every
//! transition to `Disconnected`, so repeated failures cannot pile up sockets.

use std::io::Read;

use anyhow::Result;
use log::{debug, info, warn};

use crate::clock::TimeSource;
use crate::config::{Credentials, Intervals};
use crate::interval::{IntervalTimer, MonoMs};

const FAILURE_WARN_EVERY: u32 = 10;

/// Session able to issue a GET and hand back the body as a stream.
pub trait Session {
    fn get(&mut self, url: &str) -> Result<Box<dyn Read + '_>>;
}

/// The physical link (WiFi radio on the device).
pub trait Link {
    type Session: Session;
    type Time: TimeSource;

    /// Cheap health check, no network I/O.
    fn is_up(&self) -> bool;
    /// Associate and obtain an address. May block for a bounded time.
    fn connect(&mut self, credentials: &Credentials) -> Result<()>;
    fn open_session(&mut self) -> Result<Self::Session>;
    fn open_time_source(&mut self) -> Result<Self::Time>;
}

/// Everything built on top of a live link.
pub struct Uplink<S, T> {
    pub session: S,
    pub time: T,
}

pub enum ConnectivityState<S, T> {
    Disconnected,
    Connected(Uplink<S, T>),
}

pub struct Connectivity<L: Link> {
    link: L,
    credentials: Credentials,
    state: ConnectivityState<L::Session, L::Time>,
    reconnect: IntervalTimer,
    failures: u32,
}

impl<L: Link> Connectivity<L> {
    pub fn new(link: L, credentials: Credentials, intervals: &Intervals) -> Self {
        Self {
            link,
            credentials,
            state: ConnectivityState::Disconnected,
            reconnect: IntervalTimer::new(intervals.reconnect),
            failures: 0,
        }
    }

    /// Make sure the link and its session are usable.
    ///
    /// Connected and healthy: returns immediately. Otherwise a fresh link,
    /// session and time client are set up, at most once per reconnect
    /// interval. Never fails; the outcome is the return value.
    pub fn ensure_connected(&mut self, now: MonoMs) -> bool {
        if let ConnectivityState::Connected(_) = self.state {
            if self.link.is_up() {
                return true;
            }
            warn!("Link lost, dropping session");
            self.state = ConnectivityState::Disconnected;
        }

        if !self.reconnect.try_fire(now) {
            return false;
        }

        match self.establish() {
            Ok(uplink) => {
                if self.failures > 0 {
                    info!("Connected after {} failed attempt(s)", self.failures);
                } else {
                    info!("Connected to '{}'", self.credentials.ssid);
                }
                self.failures = 0;
                self.state = ConnectivityState::Connected(uplink);
                true
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 || self.failures.is_multiple_of(FAILURE_WARN_EVERY) {
                    warn!("Connect failed ({} consecutive): {:#}", self.failures, e);
                } else {
                    debug!("Connect failed ({} consecutive)", self.failures);
                }
                self.state = ConnectivityState::Disconnected;
                false
            }
        }
    }

    fn establish(&mut self) -> Result<Uplink<L::Session, L::Time>> {
        // Stale resources go before new ones are made.
        self.state = ConnectivityState::Disconnected;
        if !self.link.is_up() {
            info!("Connecting to '{}'...", self.credentials.ssid);
            self.link.connect(&self.credentials)?;
        }
        let session = self.link.open_session()?;
        let time = self.link.open_time_source()?;
        Ok(Uplink { session, time })
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectivityState::Connected(_))
    }

    pub fn state(&self) -> &ConnectivityState<L::Session, L::Time> {
        &self.state
    }

    /// Consecutive failed connect attempts.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn session_mut(&mut self) -> Option<&mut L::Session> {
        match &mut self.state {
            ConnectivityState::Connected(up) => Some(&mut up.session),
            ConnectivityState::Disconnected => None,
        }
    }

    pub fn time_source(&mut self) -> Option<&mut dyn TimeSource> {
        match &mut self.state {
            ConnectivityState::Connected(up) => Some(&mut up.time),
            ConnectivityState::Disconnected => None,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
