//! Desktop stand-ins for the device collaborators.

use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use log::info;

use crate::clock::TimeSource;
use crate::config::{Config, Credentials};
use crate::connectivity::{Link, Session};
use crate::render::Rotation;

pub const PANEL_ROTATION: Rotation = Rotation::None;

pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Exit non-zero so a supervisor restarts the process.
pub fn restart() -> ! {
    info!("Exiting for restart");
    std::process::exit(1)
}

pub fn open_link(_config: &Config) -> Result<HostLink> {
    Ok(HostLink::default())
}

/// The workstation's own network. Always up once "connected".
#[derive(Debug, Default)]
pub struct HostLink {
    up: bool,
}

impl Link for HostLink {
    type Session = FileSession;
    type Time = SystemTimeSource;

    fn is_up(&self) -> bool {
        self.up
    }

    fn connect(&mut self, credentials: &Credentials) -> Result<()> {
        info!("Host network stands in for '{}'", credentials.ssid);
        self.up = true;
        Ok(())
    }

    fn open_session(&mut self) -> Result<FileSession> {
        Ok(FileSession)
    }

    fn open_time_source(&mut self) -> Result<SystemTimeSource> {
        Ok(SystemTimeSource)
    }
}

/// Serves `file://` URLs from disk so the harness runs offline.
#[derive(Debug)]
pub struct FileSession;

impl Session for FileSession {
    fn get(&mut self, url: &str) -> Result<Box<dyn Read + '_>> {
        let Some(path) = url.strip_prefix("file://") else {
            bail!("host harness only serves file:// feeds, got {}", url);
        };
        let file = File::open(path).with_context(|| format!("opening {}", path))?;
        info!("GET {} (local file)", url);
        Ok(Box::new(BufReader::new(file)))
    }
}

#[derive(Debug)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn sync(&mut self) -> Result<NaiveDateTime> {
        Ok(chrono::Utc::now().naive_utc())
    }
}
