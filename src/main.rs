use std::convert::Infallible;

use anyhow::Result;
use log::info;

use matrix_weather_clock::config::{Config, FATAL_COOLDOWN};
use matrix_weather_clock::platform;
use matrix_weather_clock::render::{LogPanel, MatrixRenderer};
use matrix_weather_clock::scheduler::{fatal_recovery, Monotonic, Scheduler, SystemMonotonic};

// ── Entry point ─────────────────────────────────────────────────────

fn main() {
    platform::init();

    info!(
        "BOOT matrix_weather_clock v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut mono = SystemMonotonic::new();
    match bootstrap(&mut mono) {
        Ok(never) => match never {},
        Err(e) => fatal_recovery(&e, FATAL_COOLDOWN, &mut mono, platform::restart),
    }
}

/// Everything up to the main loop. Any error here is fatal.
fn bootstrap(mono: &mut SystemMonotonic) -> Result<Infallible> {
    // ── 1. Config ──
    let cfg = Config::load(platform::config_lookup)?;

    // ── 2. Network link (radio is brought up lazily by the loop) ──
    let link = platform::open_link(&cfg)?;

    // ── 3. Display ──
    let renderer = MatrixRenderer::new(LogPanel::new(), platform::PANEL_ROTATION);

    // ── 4. Main loop ──
    let mut scheduler = Scheduler::new(&cfg, link, renderer, mono.now_ms());
    scheduler.run(mono)
}
