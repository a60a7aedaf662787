//! In-memory collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::io::{Cursor, Read};
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDateTime;

use crate::clock::TimeSource;
use crate::config::Credentials;
use crate::connectivity::{Link, Session};
use crate::display::{DisplayState, Render};

#[derive(Default)]
struct TimeState {
    utc: Option<NaiveDateTime>,
    fail_next: bool,
    calls: usize,
}

/// Time source returning a settable instant. Clones share state.
#[derive(Clone, Default)]
pub struct FakeTime(Rc<RefCell<TimeState>>);

impl FakeTime {
    pub fn at(utc: NaiveDateTime) -> Self {
        let t = Self::default();
        t.set(utc);
        t
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, utc: NaiveDateTime) {
        self.0.borrow_mut().utc = Some(utc);
    }

    pub fn fail_next(&self) {
        self.0.borrow_mut().fail_next = true;
    }

    pub fn calls(&self) -> usize {
        self.0.borrow().calls
    }
}

impl TimeSource for FakeTime {
    fn sync(&mut self) -> Result<NaiveDateTime> {
        let mut s = self.0.borrow_mut();
        s.calls += 1;
        if std::mem::take(&mut s.fail_next) {
            bail!("ntp timeout");
        }
        s.utc.ok_or_else(|| anyhow!("no ntp server"))
    }
}

struct NetState {
    up: bool,
    fail_connect: bool,
    fail_session: bool,
    fail_time: bool,
    connects: usize,
    sessions_opened: usize,
    feed: Option<String>,
    gets: usize,
}

/// Shared handle on a fake network: link state, feed body, counters.
#[derive(Clone)]
pub struct FakeNet {
    state: Rc<RefCell<NetState>>,
    live: Rc<Cell<usize>>,
    time: FakeTime,
}

impl FakeNet {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(NetState {
                up: false,
                fail_connect: false,
                fail_session: false,
                fail_time: false,
                connects: 0,
                sessions_opened: 0,
                feed: None,
                gets: 0,
            })),
            live: Rc::new(Cell::new(0)),
            time: FakeTime::default(),
        }
    }

    pub fn link(&self) -> FakeLink {
        FakeLink { net: self.clone() }
    }

    pub fn time(&self) -> &FakeTime {
        &self.time
    }

    pub fn set_up(&self, up: bool) {
        self.state.borrow_mut().up = up;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.borrow_mut().fail_connect = fail;
    }

    pub fn set_fail_session(&self, fail: bool) {
        self.state.borrow_mut().fail_session = fail;
    }

    pub fn set_fail_time(&self, fail: bool) {
        self.state.borrow_mut().fail_time = fail;
    }

    /// Body served for every GET; `None` makes GET fail.
    pub fn set_feed(&self, body: Option<&str>) {
        self.state.borrow_mut().feed = body.map(str::to_string);
    }

    pub fn connects(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.borrow().sessions_opened
    }

    pub fn gets(&self) -> usize {
        self.state.borrow().gets
    }

    pub fn live_sessions(&self) -> usize {
        self.live.get()
    }
}

pub struct FakeLink {
    net: FakeNet,
}

impl Link for FakeLink {
    type Session = FakeSession;
    type Time = FakeTime;

    fn is_up(&self) -> bool {
        self.net.state.borrow().up
    }

    fn connect(&mut self, _credentials: &Credentials) -> Result<()> {
        let mut s = self.net.state.borrow_mut();
        s.connects += 1;
        if s.fail_connect {
            bail!("association timed out");
        }
        s.up = true;
        Ok(())
    }

    fn open_session(&mut self) -> Result<FakeSession> {
        let mut s = self.net.state.borrow_mut();
        if s.fail_session {
            bail!("socket pool exhausted");
        }
        s.sessions_opened += 1;
        self.net.live.set(self.net.live.get() + 1);
        Ok(FakeSession {
            net: self.net.clone(),
        })
    }

    fn open_time_source(&mut self) -> Result<FakeTime> {
        if self.net.state.borrow().fail_time {
            bail!("ntp client init failed");
        }
        Ok(self.net.time.clone())
    }
}

pub struct FakeSession {
    net: FakeNet,
}

impl Session for FakeSession {
    fn get(&mut self, _url: &str) -> Result<Box<dyn Read + '_>> {
        let mut s = self.net.state.borrow_mut();
        s.gets += 1;
        match &s.feed {
            Some(body) => Ok(Box::new(Cursor::new(body.clone().into_bytes()))),
            None => bail!("HTTP error: status 503"),
        }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.net.live.set(self.net.live.get() - 1);
    }
}

/// One feed record in the meteo.lt shape.
pub fn feed_record(time: &str, temp: f64, feels: f64, condition: &str) -> String {
    format!(
        r#"{{"forecastTimeUtc":"{time}","airTemperature":{temp},"feelsLikeTemperature":{feels},"windSpeed":3,"windGust":7,"windDirection":210,"cloudCover":90,"seaLevelPressure":1012,"relativeHumidity":71,"totalPrecipitation":0,"conditionCode":"{condition}"}}"#
    )
}

/// A complete feed document around `records`.
pub fn feed_document(records: &[String]) -> String {
    format!(
        r#"{{"place":{{"code":"vilnius","name":"Vilnius","countryCode":"LT"}},"forecastType":"long-term","forecastCreationTimeUtc":"2024-05-01 09:05:29","forecastTimestamps":[{}]}}"#,
        records.join(",")
    )
}

#[derive(Default)]
struct RenderState {
    frames: Vec<DisplayState>,
    fail: bool,
}

/// Renderer that records every snapshot it accepts. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRender(Rc<RefCell<RenderState>>);

impl FakeRender {
    pub fn set_fail(&self, fail: bool) {
        self.0.borrow_mut().fail = fail;
    }

    pub fn frames(&self) -> Vec<DisplayState> {
        self.0.borrow().frames.clone()
    }
}

impl Render for FakeRender {
    fn render(&mut self, state: &DisplayState) -> Result<()> {
        let mut s = self.0.borrow_mut();
        if s.fail {
            bail!("panel not responding");
        }
        s.frames.push(state.clone());
        Ok(())
    }
}
