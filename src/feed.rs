//! Streaming decoder for the meteo.lt forecast document.
//!
//! The long-term forecast is several hundred records; the device cannot hold
//! the body in memory. The reader is walked with serde and each element of
//! `forecastTimestamps` is decoded on its own and handed to a callback, so at
//! most one record is alive at a time. Other top-level keys are skipped
//! without being materialised.
//!
//! ```json
//! {
//!   "place": { ... },
//!   "forecastTimestamps": [
//!     { "forecastTimeUtc": "2024-05-01 14:00:00", "airTemperature": 18.3,
//!       "feelsLikeTemperature": 16.1, "conditionCode": "cloudy",
//!       "relativeHumidity": 71, "windSpeed": 3, ... },
//!     ...
//!   ]
//! }
//! ```

use std::fmt;
use std::io::Read;
use std::ops::ControlFlow;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::error::FeedError;
use crate::forecast::{parse_forecast_time, ForecastEntry};

const SERIES_KEY: &str = "forecastTimestamps";

/// Counts from one pass over a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records handed to the callback (good or bad).
    pub records: usize,
    /// Records that failed to decode.
    pub rejected: usize,
    /// The callback asked to stop before the end of the series.
    pub stopped_early: bool,
}

/// Walk the feed in `reader`, calling `on_record` for each forecast record.
///
/// A bad record is reported to the callback as `Err` and the walk goes on.
/// Returning `ControlFlow::Break` stops the walk: nothing after that record
/// is read, so a body cut off or garbled further on still yields a clean
/// summary. The outer `Err` is reserved for a body that cannot be read as a
/// feed up to that point.
pub fn scan<R, F>(reader: R, mut on_record: F) -> Result<ScanSummary, FeedError>
where
    R: Read,
    F: FnMut(Result<ForecastEntry, FeedError>) -> ControlFlow<()>,
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    let mut summary = ScanSummary::default();
    let parsed = DocumentSeed {
        on_record: &mut on_record,
        summary: &mut summary,
    }
    .deserialize(&mut de);
    if summary.stopped_early {
        // The walk was abandoned on purpose; whatever follows is unread.
        return Ok(summary);
    }
    let found = parsed?;
    de.end()?;
    if !found {
        return Err(FeedError::MissingSeries);
    }
    Ok(summary)
}

/// Decode one record of the series.
pub fn decode_record(value: &Value) -> Result<ForecastEntry, FeedError> {
    let time = value
        .get("forecastTimeUtc")
        .and_then(Value::as_str)
        .ok_or(FeedError::Field("forecastTimeUtc"))?;
    let (date, hour) = parse_forecast_time(time)?;
    let temperature = number(value, "airTemperature")?;
    let feels_like = number(value, "feelsLikeTemperature")?;
    let condition = value
        .get("conditionCode")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(ForecastEntry {
        date,
        hour,
        temperature,
        feels_like,
        condition,
        humidity: value.get("relativeHumidity").and_then(Value::as_f64),
        wind_speed: value.get("windSpeed").and_then(Value::as_f64),
    })
}

fn number(value: &Value, key: &'static str) -> Result<f64, FeedError> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or(FeedError::Field(key))
}

// ── serde plumbing ──────────────────────────────────────────────────

type RecordSink<'a> = dyn FnMut(Result<ForecastEntry, FeedError>) -> ControlFlow<()> + 'a;

struct DocumentSeed<'a, 'f> {
    on_record: &'a mut RecordSink<'f>,
    summary: &'a mut ScanSummary,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_, '_> {
    /// Whether the series key was present.
    type Value = bool;

    fn deserialize<D>(self, deserializer: D) -> Result<bool, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed<'_, '_> {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a forecast document object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<bool, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            if key == SERIES_KEY && !found {
                map.next_value_seed(SeriesSeed {
                    on_record: &mut *self.on_record,
                    summary: &mut *self.summary,
                })?;
                found = true;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}

struct SeriesSeed<'a, 'f> {
    on_record: &'a mut RecordSink<'f>,
    summary: &'a mut ScanSummary,
}

impl<'de> DeserializeSeed<'de> for SeriesSeed<'_, '_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for SeriesSeed<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of forecast records")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(value) = seq.next_element::<Value>()? {
            let record = decode_record(&value);
            self.summary.records += 1;
            if record.is_err() {
                self.summary.rejected += 1;
            }
            if (self.on_record)(record).is_break() {
                self.summary.stopped_early = true;
                // Unwinds the parser without reading further.
                return Err(de::Error::custom("scan stopped by caller"));
            }
        }
        Ok(())
    }
}
