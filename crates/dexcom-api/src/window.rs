//! EGV query window
//!
//! The EGV endpoint rejects windows longer than `MAX_WINDOW_DAYS`. The window
//! starts at the earliest available record; when the data range is longer than
//! allowed, the end is pulled in to `start + MAX_WINDOW_DAYS`.

use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{MAX_WINDOW_DAYS, SYSTEM_TIME_FORMAT};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct RecordRange {
    start: RecordTime,
    end: RecordTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordTime {
    system_time: String,
}

/// Start and end timestamps for an EGV query, formatted as Dexcom expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgvWindow {
    pub start: String,
    pub end: String,
    /// Whether `end` was pulled in from the upstream value
    pub clamped: bool,
}

impl EgvWindow {
    /// Derive the window from a `dataRange` response body.
    ///
    /// Fails with `Error::MissingDataRange` when the body has no `egvs` key,
    /// and `Error::InvalidDateRange` when the key is present but malformed.
    pub fn from_data_range(data_range: &Value) -> Result<Self> {
        let egvs = data_range.get("egvs").ok_or(Error::MissingDataRange)?;
        let range = RecordRange::deserialize(egvs)
            .map_err(|e| Error::InvalidDateRange(e.to_string()))?;
        Self::clamp(range.start.system_time, range.end.system_time)
    }

    /// Build a window, clamping `end` to at most `MAX_WINDOW_DAYS` after `start`.
    ///
    /// Unclamped values are passed through byte for byte.
    pub fn clamp(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let start = start.into();
        let end = end.into();
        let start_at = parse_system_time(&start)?;
        let end_at = parse_system_time(&end)?;

        let max_end = start_at.checked_add_signed(Duration::days(MAX_WINDOW_DAYS));
        match max_end {
            Some(max_end) if end_at > max_end => Ok(Self {
                start,
                end: max_end.format(SYSTEM_TIME_FORMAT).to_string(),
                clamped: true,
            }),
            _ => Ok(Self {
                start,
                end,
                clamped: false,
            }),
        }
    }
}

fn parse_system_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, SYSTEM_TIME_FORMAT)
        .map_err(|e| Error::InvalidDateRange(format!("{value:?}: {e}")))
}
