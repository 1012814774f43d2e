//! The watermark is the start instant of the last run that relayed at least one record. It is
//! the lower bound (`from_date`) of the next run's queries.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::Error;
use crate::Result;

/// SSM Parameter Store backed [`WatermarkStore`].
mod parameter_store;

/// Single named string value that survives between invocations.
///
/// Invocations are assumed to be serialized by whatever triggers them: two concurrent runs would
/// both read the same value and the last `put` would win.
#[trait_variant::make(WatermarkStore: Send)]
pub trait LocalWatermarkStore {
    /// Returns `None` when the value has never been written.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    async fn put(&mut self, name: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Parses an ISO-8601 timestamp. Values with an offset are normalised to UTC; values without
    /// one (as written by older pollers) are taken to be UTC already.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self(with_offset.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| Error::Watermark(format!("invalid watermark {value:?}: {e}")))
    }

    /// Epoch seconds, truncated, as sent in `from_date`.
    pub fn query_window(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// The stored representation, e.g. `2024-03-16T12:34:56.123456Z`.
    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}
