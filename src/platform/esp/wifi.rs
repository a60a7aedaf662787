use std::time::Duration;

use anyhow::{anyhow, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{debug, info};

use super::http_client::EspSession;
use super::time_sync::SntpTimeSource;
use crate::config::Credentials;
use crate::connectivity::Link;

/// Station-mode WiFi plus the factories for what runs over it.
pub struct EspLink {
    wifi: Box<EspWifi<'static>>,
    sysloop: EspSystemEventLoop,
    request_timeout: Duration,
}

impl EspLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        request_timeout: Duration,
    ) -> Result<Self> {
        let wifi = EspWifi::new(modem, sysloop.clone(), None)?;
        Ok(Self {
            wifi: Box::new(wifi),
            sysloop,
            request_timeout,
        })
    }
}

/// Log AP association state from ESP-IDF internals.
fn log_wifi_diag(label: &str) {
    let mut ap_info: esp_idf_sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
    let rc = unsafe { esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
    if rc == esp_idf_sys::ESP_OK {
        debug!(
            "WiFi [{}]: assoc=YES rssi={} ch={}",
            label, ap_info.rssi, ap_info.primary
        );
    } else {
        debug!("WiFi [{}]: assoc=NO (ap_info err={})", label, rc);
    }
}

impl Link for EspLink {
    type Session = EspSession;
    type Time = SntpTimeSource;

    fn is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    /// One association attempt. Pacing between attempts is the caller's job.
    fn connect(&mut self, credentials: &Credentials) -> Result<()> {
        let auth = if credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let mut ssid = heapless::String::<32>::new();
        let mut pass = heapless::String::<64>::new();
        ssid.push_str(&credentials.ssid)
            .map_err(|_| anyhow!("SSID longer than 32 bytes"))?;
        pass.push_str(&credentials.password)
            .map_err(|_| anyhow!("password longer than 64 bytes"))?;

        let mut wifi = BlockingWifi::wrap(&mut *self.wifi, self.sysloop.clone())?;

        if wifi.is_started()? {
            // Reset radio state left over from a dropped association.
            let _ = wifi.disconnect();
        }
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password: pass,
            auth_method: auth,
            ..Default::default()
        }))?;
        if !wifi.is_started()? {
            wifi.start()?;
        }

        let t0 = unsafe { esp_idf_sys::esp_timer_get_time() };
        let joined = wifi.connect();
        let elapsed_ms = (unsafe { esp_idf_sys::esp_timer_get_time() } - t0) / 1000;
        log_wifi_diag(if joined.is_ok() { "connect OK" } else { "connect FAIL" });
        joined?;
        info!("WiFi associated in {}ms, waiting for IP address...", elapsed_ms);

        wifi.wait_netif_up()?;
        let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi connected, IP: {}", ip_info.ip);
        Ok(())
    }

    fn open_session(&mut self) -> Result<EspSession> {
        EspSession::new(self.request_timeout)
    }

    fn open_time_source(&mut self) -> Result<SntpTimeSource> {
        SntpTimeSource::new()
    }
}
