//! Typed event streams produced by extraction.
//!
//! Instants cross the worker boundary as epoch milliseconds, so every
//! `DateTime<Utc>` here serializes through `ts_milliseconds`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One discrete apnea-type occurrence (obstructive, clear airway, mixed).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEvent {
    #[serde(
        rename = "date",
        alias = "timestamp",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub timestamp: DateTime<Utc>,
    pub duration_sec: f64,
}

impl AnnotationEvent {
    pub fn new(timestamp: DateTime<Utc>, duration_sec: f64) -> Self {
        Self {
            timestamp,
            duration_sec,
        }
    }

    /// Instant the event stops: timestamp plus its duration.
    /// Zero-duration markers end where they start.
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp
            .checked_add_signed(duration_from_secs(self.duration_sec))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Inclusive overlap with `[start, end]`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.timestamp <= end && self.end() >= start
    }
}

/// One flow-limitation reading, normalized to a 0..1+ fraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowSample {
    #[serde(
        rename = "date",
        alias = "timestamp",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub timestamp: DateTime<Utc>,
    pub level: f64,
}

impl FlowSample {
    pub fn new(timestamp: DateTime<Utc>, level: f64) -> Self {
        Self { timestamp, level }
    }
}

/// Signed seconds from `from` to `to`, at millisecond resolution.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

pub fn duration_from_secs(secs: f64) -> Duration {
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_event_end_adds_duration() {
        let event = AnnotationEvent::new(at(0), 12.5);
        assert_eq!(event.end(), at(12) + Duration::milliseconds(500));
    }

    #[test]
    fn test_zero_duration_event_ends_at_start() {
        let event = AnnotationEvent::new(at(10), 0.0);
        assert_eq!(event.end(), event.timestamp);
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let event = AnnotationEvent::new(at(10), 10.0);
        assert!(event.overlaps(at(20), at(30)));
        assert!(event.overlaps(at(0), at(10)));
        assert!(!event.overlaps(at(21), at(30)));
    }

    #[test]
    fn test_event_serializes_date_as_epoch_millis() {
        let event = AnnotationEvent::new(at(0), 10.0);
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["date"], serde_json::json!(1_700_000_000_000i64));
        assert_eq!(value["durationSec"], serde_json::json!(10.0));
    }

    #[test]
    fn test_seconds_between_is_signed() {
        assert_eq!(seconds_between(at(0), at(5)), 5.0);
        assert_eq!(seconds_between(at(5), at(0)), -5.0);
    }
}
