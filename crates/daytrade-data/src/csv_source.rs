//! CSV data source.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use daytrade_core::error::DataError;
use daytrade_core::types::Bar;

/// CSV record format.
///
/// Blank or non-numeric prices load as NaN so the engine reports the bar
/// as a data gap instead of trading on a made-up value.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "Timestamp", alias = "Datetime", alias = "datetime")]
    timestamp: String,
    #[serde(alias = "Open", default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(alias = "High", default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(alias = "Low", default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(alias = "Close", default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(alias = "Volume", default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl CsvRecord {
    fn into_bar(self, timestamp: i64) -> Bar {
        let value = |v: Option<f64>| v.unwrap_or(f64::NAN);
        Bar::new(
            timestamp,
            value(self.open),
            value(self.high),
            value(self.low),
            value(self.close),
            value(self.volume),
        )
    }
}

/// CSV data source for historical bars.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DataError::NoDataAvailable(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bars in file order.
    pub fn load(&self) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result
                .map_err(|e| DataError::ParseError(format!("row {}: {e}", line + 1)))?;
            let timestamp = parse_timestamp(&record.timestamp)?;
            bars.push(record.into_bar(timestamp));
        }

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable(self.path.display().to_string()));
        }
        debug!(path = %self.path.display(), bars = bars.len(), "Loaded bars");
        Ok(bars)
    }
}

/// Parse a timestamp into Unix milliseconds.
///
/// Accepts RFC 3339, common date and date-time layouts (read as UTC) and
/// Unix seconds or milliseconds.
pub(crate) fn parse_timestamp(value: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = value.parse::<i64>() {
        // More than 10 digits means milliseconds
        return Ok(if ts.abs() > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!("Could not parse date: {value}")))
}
