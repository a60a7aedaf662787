use anyhow::Result;

use crate::clock::ClockReading;
use crate::forecast::condition_label;
use crate::weather::WeatherReading;

/// Weekday abbreviations, Monday first.
pub const WEEKDAYS: [&str; 7] = ["Pirm", "Antr", "Trec", "Ketv", "Penkt", "Sest", "Sekm"];

const TIME_PLACEHOLDER: &str = "00:00";
const PLACEHOLDER: &str = "...";

/// Everything the panel shows, as text. Rebuilt from scratch every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub time_text: String,
    pub date_text: String,
    pub weekday_text: String,
    pub weather_text: String,
    pub condition_text: String,
    pub blink_on: bool,
}

impl DisplayState {
    pub fn project(
        clock: Option<&ClockReading>,
        weather: Option<&WeatherReading>,
        blink_on: bool,
    ) -> Self {
        let (time_text, date_text, weekday_text) = match clock {
            Some(c) => {
                let sep = if blink_on { ':' } else { ' ' };
                (
                    format!("{:02}{}{:02}", c.hour, sep, c.minute),
                    format!("{:02}.{:02}", c.month, c.day),
                    WEEKDAYS
                        .get(usize::from(c.weekday))
                        .copied()
                        .unwrap_or(PLACEHOLDER)
                        .to_string(),
                )
            }
            None => (
                TIME_PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
            ),
        };

        let (weather_text, condition_text) = match weather {
            Some(w) => (
                format!(
                    "{:.1}°c     {:.1}°c",
                    w.entry.temperature, w.entry.feels_like
                ),
                condition_label(&w.entry.condition).to_string(),
            ),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };

        Self {
            time_text,
            date_text,
            weekday_text,
            weather_text,
            condition_text,
            blink_on,
        }
    }
}

/// Consumer of display snapshots. Owns all pixel work.
pub trait Render {
    fn render(&mut self, state: &DisplayState) -> Result<()>;
}
