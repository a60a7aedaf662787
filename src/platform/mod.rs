//! Board support: the concrete link, time source, panel and restart hook.
//!
//! On ESP-IDF these are the WiFi radio, SNTP and the HTTPS client. Anywhere
//! else a desktop harness stands in so the loop can be run on a workstation.

#[cfg(target_os = "espidf")]
mod esp;
#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(not(target_os = "espidf"))]
mod host;
#[cfg(not(target_os = "espidf"))]
pub use host::*;

/// Config lookup: runtime environment first, then values baked in by
/// `build.rs` from `wifi.local.rs`.
pub fn config_lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| baked(key).map(str::to_string))
}

fn baked(key: &str) -> Option<&'static str> {
    match key {
        "WIFI_SSID" => option_env!("LOCAL_WIFI_SSID"),
        "WIFI_PASSWORD" => option_env!("LOCAL_WIFI_PASS"),
        "WEATHER_URL" => option_env!("LOCAL_WEATHER_URL"),
        _ => None,
    }
}
