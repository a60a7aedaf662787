use std::borrow::Borrow;
use std::ops::ControlFlow;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::clock::ClockReading;
use crate::error::FeedError;

/// One hourly prediction from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub date: NaiveDate,
    pub hour: u8,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// The `(date, hour)` slot a forecast entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    pub date: NaiveDate,
    pub hour: u8,
}

impl ForecastKey {
    pub fn of_reading(reading: &ClockReading) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(
            reading.year,
            u32::from(reading.month),
            u32::from(reading.day),
        )?;
        Some(Self {
            date,
            hour: reading.hour,
        })
    }

    pub fn matches(&self, entry: &ForecastEntry) -> bool {
        entry.date == self.date && entry.hour == self.hour
    }
}

/// Incremental form of [`select`] for series that arrive one record at a
/// time. Keeps the first entry offered for the wanted slot.
#[derive(Debug)]
pub struct ForecastSelector {
    key: ForecastKey,
    found: Option<ForecastEntry>,
}

impl ForecastSelector {
    pub fn for_reading(now: &ClockReading) -> Option<Self> {
        Some(Self {
            key: ForecastKey::of_reading(now)?,
            found: None,
        })
    }

    pub fn key(&self) -> ForecastKey {
        self.key
    }

    /// Offer the next entry in series order. Breaks once a match is held.
    pub fn offer(&mut self, entry: &ForecastEntry) -> ControlFlow<()> {
        if self.found.is_none() && self.key.matches(entry) {
            self.found = Some(entry.clone());
        }
        if self.found.is_some() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    pub fn into_match(self) -> Option<ForecastEntry> {
        self.found
    }
}

/// Pick the forecast for the hour `now` falls in.
///
/// Exact `(date, hour)` equality; when the feed repeats a slot the first
/// occurrence wins. No clock reading, or no matching slot, gives `None`.
pub fn select<I>(series: I, now: Option<&ClockReading>) -> Option<ForecastEntry>
where
    I: IntoIterator,
    I::Item: Borrow<ForecastEntry>,
{
    let mut selector = ForecastSelector::for_reading(now?)?;
    for item in series {
        let entry: &ForecastEntry = item.borrow();
        if selector.offer(entry).is_break() {
            break;
        }
    }
    selector.into_match()
}

/// Parse a `forecastTimeUtc` value into its date and hour.
///
/// Only the exact `YYYY-MM-DD HH:MM:SS` shape is accepted.
pub fn parse_forecast_time(raw: &str) -> Result<(NaiveDate, u8), FeedError> {
    let b = raw.as_bytes();
    let shaped = b.len() == 19
        && b[4] == b'-'
        && b[7] == b'-'
        && b[10] == b' '
        && b[13] == b':'
        && b[16] == b':'
        && b
            .iter()
            .enumerate()
            .all(|(i, c)| matches!(i, 4 | 7 | 10 | 13 | 16) || c.is_ascii_digit());
    if !shaped {
        return Err(FeedError::Timestamp(raw.to_string()));
    }
    let dt = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| FeedError::Timestamp(raw.to_string()))?;
    Ok((dt.date(), dt.hour() as u8))
}

/// Short display label for a meteo.lt `conditionCode`.
///
/// The matrix fonts are ASCII/Latin-1, so Lithuanian diacritics are dropped.
/// Unknown codes are shown as-is.
pub fn condition_label(code: &str) -> &str {
    match code {
        "clear" => "Giedra",
        "partly-cloudy" => "Mazai debesuota",
        "cloudy-with-sunny-intervals" => "Pragiedruliai",
        "cloudy" => "Debesuota",
        "light-rain" => "Silpnas lietus",
        "rain" => "Lietus",
        "heavy-rain" => "Smarkus lietus",
        "thunder" | "isolated-thunderstorms" | "thunderstorms" => "Perkunija",
        "heavy-rain-with-thunderstorms" => "Liutis",
        "light-sleet" | "sleet" => "Slapdriba",
        "freezing-rain" => "Lijundra",
        "hail" => "Krusa",
        "light-snow" => "Silpnas sniegas",
        "snow" => "Sniegas",
        "heavy-snow" => "Smarkus sniegas",
        "fog" => "Rukas",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(year: i32, month: u8, day: u8, hour: u8) -> ClockReading {
        ClockReading {
            year,
            month,
            day,
            hour,
            minute: 30,
            weekday: 2,
        }
    }

    fn entry(date: &str, hour: u8, temperature: f64, feels_like: f64) -> ForecastEntry {
        ForecastEntry {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            hour,
            temperature,
            feels_like,
            condition: "cloudy".to_string(),
            humidity: None,
            wind_speed: None,
        }
    }

    #[test]
    fn empty_series_never_matches() {
        let series: Vec<ForecastEntry> = Vec::new();
        assert_eq!(select(&series, Some(&reading(2024, 5, 1, 14))), None);
        assert_eq!(select(&series, Some(&reading(1999, 12, 31, 0))), None);
        assert_eq!(select(&series, None), None);
    }

    #[test]
    fn matching_hour_is_returned_exactly() {
        let series = vec![
            entry("2024-05-01", 13, 17.0, 15.2),
            entry("2024-05-01", 14, 18.3, 16.1),
            entry("2024-05-01", 15, 19.0, 17.4),
        ];
        let got = select(&series, Some(&reading(2024, 5, 1, 14))).unwrap();
        assert_eq!(got, series[1]);
        assert_eq!(got.temperature, 18.3);
        assert_eq!(got.feels_like, 16.1);
    }

    #[test]
    fn duplicate_slot_takes_first() {
        let series = vec![
            entry("2024-05-01", 14, 18.3, 16.1),
            entry("2024-05-01", 14, 25.0, 24.0),
        ];
        let got = select(series.iter(), Some(&reading(2024, 5, 1, 14))).unwrap();
        assert_eq!(got.temperature, 18.3);
    }

    #[test]
    fn same_hour_other_day_is_not_a_match() {
        let series = vec![entry("2024-05-02", 14, 18.3, 16.1)];
        assert_eq!(select(&series, Some(&reading(2024, 5, 1, 14))), None);
    }

    #[test]
    fn absent_clock_gives_none() {
        let series = vec![entry("2024-05-01", 14, 18.3, 16.1)];
        assert_eq!(select(&series, None), None);
    }

    #[test]
    fn parses_feed_timestamp() {
        let (date, hour) = parse_forecast_time("2024-05-01 14:00:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(hour, 14);
    }

    #[test]
    fn rejects_other_timestamp_shapes() {
        for raw in [
            "2024-05-01T14:00:00",
            "2024-05-01 14:00",
            "2024/05/01 14:00:00",
            "2024-5-1 14:00:00",
            "2024-05-01 14:00:00Z",
            "2024-13-01 14:00:00",
            "",
        ] {
            assert!(
                matches!(parse_forecast_time(raw), Err(FeedError::Timestamp(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn selector_holds_first_match_and_breaks() {
        let now = reading(2024, 5, 1, 14);
        let mut sel = ForecastSelector::for_reading(&now).unwrap();
        assert!(sel.offer(&entry("2024-05-01", 13, 1.0, 1.0)).is_continue());
        assert!(sel.offer(&entry("2024-05-01", 14, 2.0, 2.0)).is_break());
        assert!(sel.offer(&entry("2024-05-01", 14, 3.0, 3.0)).is_break());
        assert_eq!(sel.into_match().map(|e| e.temperature), Some(2.0));
    }

    #[test]
    fn impossible_reading_has_no_key() {
        assert!(ForecastSelector::for_reading(&reading(2024, 2, 30, 10)).is_none());
    }

    #[test]
    fn condition_labels() {
        assert_eq!(condition_label("cloudy"), "Debesuota");
        assert_eq!(condition_label("clear"), "Giedra");
        assert_eq!(condition_label("volcanic-ash"), "volcanic-ash");
    }
}
