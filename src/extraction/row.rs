//! Adapter from loosely shaped JSON rows to a fixed record.
//!
//! Field names are resolved once here; nothing downstream looks fields up by
//! string key.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::normalize::to_valid_instant;

const TYPE_FIELDS: [&str; 2] = ["Event", "type"];
const TIMESTAMP_FIELDS: [&str; 3] = ["DateTime", "date", "timestamp"];
const MAGNITUDE_FIELDS: [&str; 4] = ["Data/Duration", "value", "duration", "level"];

/// One detail row with validated timestamp and magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    /// Duration in seconds for annotations, level for flow limitation.
    pub magnitude: f64,
}

/// Why a row did not make it into a typed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    NotAnObject,
    MissingType,
    InvalidTimestamp,
    InvalidMagnitude,
}

fn first_field<'a>(row: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| row.get(*name).filter(|v| !v.is_null()))
}

/// Row type field, if the row carries one.
pub fn event_type_of(row: &Value) -> Option<&str> {
    first_field(row, &TYPE_FIELDS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn parse_magnitude(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

impl DetailRow {
    pub fn from_value(row: &Value) -> Result<Self, RowRejection> {
        if !row.is_object() {
            return Err(RowRejection::NotAnObject);
        }

        let event_type = event_type_of(row).ok_or(RowRejection::MissingType)?;

        let timestamp = to_valid_instant(&first_field(row, &TIMESTAMP_FIELDS))
            .ok_or(RowRejection::InvalidTimestamp)?;

        let magnitude = first_field(row, &MAGNITUDE_FIELDS)
            .and_then(parse_magnitude)
            .ok_or(RowRejection::InvalidMagnitude)?;

        Ok(Self {
            event_type: event_type.to_string(),
            timestamp,
            magnitude,
        })
    }
}
