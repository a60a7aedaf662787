use thiserror::Error;

/// Failures while decoding the weather feed.
///
/// `Timestamp` and `Field` concern a single record and only cost that record.
/// `Json` and `MissingSeries` mean the stream as a whole could not be read;
/// the fetch is then retried like any other network failure.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("bad forecastTimeUtc {0:?}")]
    Timestamp(String),
    #[error("missing or mistyped field {0}")]
    Field(&'static str),
    #[error("feed unreadable: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feed has no forecastTimestamps array")]
    MissingSeries,
}

impl FeedError {
    /// True when the error only invalidates one record.
    pub fn is_per_entry(&self) -> bool {
        matches!(self, FeedError::Timestamp(_) | FeedError::Field(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_are_per_entry() {
        assert!(FeedError::Timestamp("2024-05-01T14:00".into()).is_per_entry());
        assert!(FeedError::Field("airTemperature").is_per_entry());
        assert!(!FeedError::MissingSeries.is_per_entry());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!FeedError::from(json).is_per_entry());
    }
}
