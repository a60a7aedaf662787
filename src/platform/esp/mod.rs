mod http_client;
mod time_sync;
mod wifi;

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;

use crate::config::Config;
use crate::render::Rotation;

pub use http_client::EspSession;
pub use time_sync::SntpTimeSource;
pub use wifi::EspLink;

/// The matrix is mounted upside down.
pub const PANEL_ROTATION: Rotation = Rotation::Half;

pub fn init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[allow(unreachable_code)]
pub fn restart() -> ! {
    unsafe { esp_idf_sys::esp_restart() };
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

pub fn open_link(config: &Config) -> Result<EspLink> {
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    EspLink::new(peripherals.modem, sysloop, config.request_timeout)
}
