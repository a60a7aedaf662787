use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;

const KEY_WIFI_SSID: &str = "WIFI_SSID";
const KEY_WIFI_PASS: &str = "WIFI_PASSWORD";
const KEY_WEATHER_URL: &str = "WEATHER_URL";
const KEY_TZ_OFFSET: &str = "TZ_OFFSET_HOURS";
const KEY_WEATHER_CHECK_SECS: &str = "WEATHER_CHECK_SECS";
const KEY_NTP_SYNC_SECS: &str = "NTP_SYNC_SECS";
const KEY_RECONNECT_SECS: &str = "RECONNECT_SECS";

const DEFAULT_WEATHER_URL: &str = "https://api.meteo.lt/v1/places/vilnius/forecasts/long-term";
const DEFAULT_TZ_OFFSET_HOURS: i32 = 2;
const DEFAULT_BLINK: Duration = Duration::from_secs(1);
const DEFAULT_WEATHER_CHECK: Duration = Duration::from_secs(30 * 60);
const DEFAULT_NTP_SYNC: Duration = Duration::from_secs(60 * 60);
const DEFAULT_RECONNECT: Duration = Duration::from_secs(5);
const DEFAULT_TICK_YIELD: Duration = Duration::from_millis(100);
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Delay before restarting after a bootstrap failure. Not configurable: the
/// configuration itself may be what failed.
pub const FATAL_COOLDOWN: Duration = Duration::from_secs(5);

/// Network identity and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &format_args!("<{} chars>", self.password.len()))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub blink: Duration,
    pub weather_check: Duration,
    pub ntp_sync: Duration,
    pub reconnect: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            blink: DEFAULT_BLINK,
            weather_check: DEFAULT_WEATHER_CHECK,
            ntp_sync: DEFAULT_NTP_SYNC,
            reconnect: DEFAULT_RECONNECT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub weather_url: String,
    pub tz_offset_hours: i32,
    pub intervals: Intervals,
    pub tick_yield: Duration,
    pub error_backoff: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Config with the given credentials and every other value at its default.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            tz_offset_hours: DEFAULT_TZ_OFFSET_HOURS,
            intervals: Intervals::default(),
            tick_yield: DEFAULT_TICK_YIELD,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build the config from a key lookup (environment, baked-in values).
    ///
    /// WiFi SSID and password are required; a missing one is a boot failure.
    /// Everything else falls back to defaults.
    pub fn load<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ssid = lookup(KEY_WIFI_SSID)
            .filter(|s| !s.trim().is_empty())
            .with_context(|| format!("{} is not set", KEY_WIFI_SSID))?;
        let password =
            lookup(KEY_WIFI_PASS).with_context(|| format!("{} is not set", KEY_WIFI_PASS))?;
        info!("config wifi_ssid = {:?}", ssid);
        info!("config wifi_pass = <{} chars>", password.len());

        let mut cfg = Config::with_credentials(Credentials { ssid, password });

        if let Some(url) = lookup(KEY_WEATHER_URL).filter(|s| !s.trim().is_empty()) {
            cfg.weather_url = url.trim().to_string();
        }
        info!("config weather_url = {:?}", cfg.weather_url);

        if let Some(raw) = lookup(KEY_TZ_OFFSET) {
            let offset: i32 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} = {:?} is not an integer", KEY_TZ_OFFSET, raw))?;
            if !(-12..=14).contains(&offset) {
                bail!("{} = {} is outside -12..=14", KEY_TZ_OFFSET, offset);
            }
            cfg.tz_offset_hours = offset;
        }
        info!("config tz_offset_hours = {}", cfg.tz_offset_hours);

        cfg.intervals.weather_check =
            secs_or(&lookup, KEY_WEATHER_CHECK_SECS, cfg.intervals.weather_check)?;
        cfg.intervals.ntp_sync = secs_or(&lookup, KEY_NTP_SYNC_SECS, cfg.intervals.ntp_sync)?;
        cfg.intervals.reconnect = secs_or(&lookup, KEY_RECONNECT_SECS, cfg.intervals.reconnect)?;
        // One blocking connect attempt per tick at most.
        if cfg.intervals.reconnect.is_zero() {
            bail!("{} must be at least 1", KEY_RECONNECT_SECS);
        }
        info!(
            "config intervals: weather={}s ntp={}s reconnect={}s",
            cfg.intervals.weather_check.as_secs(),
            cfg.intervals.ntp_sync.as_secs(),
            cfg.intervals.reconnect.as_secs()
        );

        Ok(cfg)
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} = {:?} is not a number of seconds", key, raw))?;
            Ok(Duration::from_secs(secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_with_credentials_only() {
        let cfg = Config::load(env(&[("WIFI_SSID", "home"), ("WIFI_PASSWORD", "secret")])).unwrap();
        assert_eq!(cfg.credentials.ssid, "home");
        assert_eq!(cfg.weather_url, DEFAULT_WEATHER_URL);
        assert_eq!(cfg.tz_offset_hours, 2);
        assert_eq!(cfg.intervals.weather_check, Duration::from_secs(1800));
        assert_eq!(cfg.intervals.ntp_sync, Duration::from_secs(3600));
        assert_eq!(cfg.intervals.blink, Duration::from_secs(1));
    }

    #[test]
    fn missing_credentials_fail() {
        assert!(Config::load(env(&[("WIFI_PASSWORD", "secret")])).is_err());
        assert!(Config::load(env(&[("WIFI_SSID", "home")])).is_err());
        assert!(Config::load(env(&[("WIFI_SSID", "  "), ("WIFI_PASSWORD", "x")])).is_err());
    }

    #[test]
    fn open_network_password_may_be_empty() {
        let cfg = Config::load(env(&[("WIFI_SSID", "cafe"), ("WIFI_PASSWORD", "")])).unwrap();
        assert!(cfg.credentials.password.is_empty());
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = Config::load(env(&[
            ("WIFI_SSID", "home"),
            ("WIFI_PASSWORD", "secret"),
            ("TZ_OFFSET_HOURS", "-5"),
            ("WEATHER_CHECK_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(cfg.tz_offset_hours, -5);
        assert_eq!(cfg.intervals.weather_check, Duration::from_secs(60));

        assert!(Config::load(env(&[
            ("WIFI_SSID", "home"),
            ("WIFI_PASSWORD", "secret"),
            ("NTP_SYNC_SECS", "hourly"),
        ]))
        .is_err());
        assert!(Config::load(env(&[
            ("WIFI_SSID", "home"),
            ("WIFI_PASSWORD", "secret"),
            ("TZ_OFFSET_HOURS", "30"),
        ]))
        .is_err());
    }

    #[test]
    fn zero_reconnect_interval_is_rejected() {
        let err = Config::load(env(&[
            ("WIFI_SSID", "home"),
            ("WIFI_PASSWORD", "secret"),
            ("RECONNECT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RECONNECT_SECS"));

        let cfg = Config::load(env(&[
            ("WIFI_SSID", "home"),
            ("WIFI_PASSWORD", "secret"),
            ("RECONNECT_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.intervals.reconnect, Duration::from_secs(1));
    }

    #[test]
    fn fatal_cooldown_is_fixed() {
        assert_eq!(FATAL_COOLDOWN, Duration::from_secs(5));
    }

    #[test]
    fn debug_hides_password() {
        let c = Credentials {
            ssid: "home".into(),
            password: "hunter2".into(),
        };
        let s = format!("{:?}", c);
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<7 chars>"));
    }
}
