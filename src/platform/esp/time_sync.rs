use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDateTime};
use esp_idf_svc::sntp::{EspSntp, OperatingMode, SntpConf, SyncMode, SyncStatus};
use log::info;

use crate::clock::TimeSource;

const SNTP_SERVER: &str = "pool.ntp.org";
const SYNC_TIMEOUT_MS: u32 = 10_000;
const POLL_INTERVAL_MS: u32 = 250;

/// SNTP client. Dropping it stops background sync.
pub struct SntpTimeSource {
    sntp: EspSntp<'static>,
}

impl SntpTimeSource {
    pub fn new() -> Result<Self> {
        let conf = SntpConf {
            servers: [SNTP_SERVER, "time.nist.gov"],
            sync_mode: SyncMode::Immediate,
            operating_mode: OperatingMode::Poll,
        };
        info!("Starting SNTP with {}", SNTP_SERVER);
        let sntp = EspSntp::new_with_callback(&conf, |_| {
            info!("SNTP sync callback triggered");
        })?;
        Ok(Self { sntp })
    }
}

impl TimeSource for SntpTimeSource {
    /// Wait (bounded) for the first sync, then read the system clock as UTC.
    fn sync(&mut self) -> Result<NaiveDateTime> {
        let mut elapsed_ms = 0u32;
        while self.sntp.get_sync_status() != SyncStatus::Completed {
            if elapsed_ms >= SYNC_TIMEOUT_MS {
                bail!("SNTP not synchronized within {}s", SYNC_TIMEOUT_MS / 1000);
            }
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS as u64));
            elapsed_ms += POLL_INTERVAL_MS;
        }
        system_utc()
    }
}

fn system_utc() -> Result<NaiveDateTime> {
    let mut now: libc::time_t = 0;
    unsafe {
        libc::time(&mut now);
    }
    // Near epoch means the clock has not been set yet.
    if now < 1_000_000_000 {
        bail!("system clock not set");
    }
    DateTime::from_timestamp(i64::from(now), 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow!("time_t {} out of range", now))
}
