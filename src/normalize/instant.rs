//! Instant coercion shared by row extraction and result normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Naive layouts seen in therapy exports. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
];

/// Anything that may carry an instant across the worker boundary.
pub trait IntoInstant {
    /// Resolve to a valid instant, or `None` when the value is not one.
    fn to_valid_instant(&self) -> Option<DateTime<Utc>>;
}

impl IntoInstant for DateTime<Utc> {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl IntoInstant for f64 {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        if !self.is_finite() {
            return None;
        }
        Utc.timestamp_millis_opt(self.round() as i64).single()
    }
}

impl IntoInstant for i64 {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(*self).single()
    }
}

impl IntoInstant for str {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant_str(self)
    }
}

impl IntoInstant for Value {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Number(n) => match n.as_i64() {
                Some(ms) => ms.to_valid_instant(),
                None => n.as_f64()?.to_valid_instant(),
            },
            Value::String(s) => parse_instant_str(s),
            _ => None,
        }
    }
}

impl<T: IntoInstant + ?Sized> IntoInstant for Option<&T> {
    fn to_valid_instant(&self) -> Option<DateTime<Utc>> {
        (*self).and_then(|v| v.to_valid_instant())
    }
}

pub fn to_valid_instant<T: IntoInstant + ?Sized>(value: &T) -> Option<DateTime<Utc>> {
    value.to_valid_instant()
}

fn parse_instant_str(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
