//! Clock and hourly weather for a 64x32 LED matrix.
//!
//! All scheduling, parsing and layout logic lives here and runs on the host;
//! the board-specific collaborators are in [`platform`].

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod feed;
pub mod forecast;
pub mod interval;
pub mod layout;
pub mod platform;
pub mod render;
pub mod scheduler;
pub mod weather;

#[cfg(test)]
mod testing;
