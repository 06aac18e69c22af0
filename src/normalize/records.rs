//! Rebuild typed results from the plain JSON that crossed the worker boundary.
//!
//! Fallback order for instants is primary field, then member events, then
//! the peer field. A record whose `start` cannot be resolved is dropped.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{
    seconds_between, AnalysisResult, AnnotationEvent, Cluster, FalseNegativeWindow,
};

use super::instant::to_valid_instant;

fn finite_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn instant_field(record: &Value, key: &str) -> Option<DateTime<Utc>> {
    to_valid_instant(&record.get(key))
}

/// Member event; `None` when its date does not resolve.
pub fn normalize_event(value: &Value) -> Option<AnnotationEvent> {
    let timestamp =
        instant_field(value, "date").or_else(|| instant_field(value, "timestamp"))?;
    let duration_sec = finite_f64(value.get("durationSec"))
        .filter(|d| *d >= 0.0)
        .unwrap_or(0.0);

    Some(AnnotationEvent::new(timestamp, duration_sec))
}

pub fn normalize_cluster(value: &Value) -> Option<Cluster> {
    let events: Vec<AnnotationEvent> = value
        .get("events")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_event).collect())
        .unwrap_or_default();

    let start = instant_field(value, "start")
        .or_else(|| events.first().map(|e| e.timestamp))?;
    let end = instant_field(value, "end")
        .or_else(|| events.last().map(|e| e.timestamp))
        .unwrap_or(start)
        .max(start);

    let duration_sec = finite_f64(value.get("durationSec"))
        .unwrap_or_else(|| seconds_between(start, end));
    let severity = finite_f64(value.get("severity")).unwrap_or(0.0);

    Some(Cluster {
        start,
        end,
        duration_sec,
        count: events.len(),
        events,
        severity,
    })
}

pub fn normalize_false_negative(value: &Value) -> Option<FalseNegativeWindow> {
    let start = instant_field(value, "start")?;
    let end = instant_field(value, "end").unwrap_or(start).max(start);

    Some(FalseNegativeWindow {
        start,
        end,
        duration_sec: finite_f64(value.get("durationSec"))
            .unwrap_or_else(|| seconds_between(start, end)),
        confidence: finite_f64(value.get("confidence")).unwrap_or(0.0),
    })
}

/// Normalize the `data` object of a success response.
pub fn normalize_results(data: &Value) -> AnalysisResult {
    let records = |key: &str| -> Vec<Value> {
        data.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    AnalysisResult {
        clusters: records("clusters")
            .iter()
            .filter_map(normalize_cluster)
            .collect(),
        false_negatives: records("falseNegatives")
            .iter()
            .filter_map(normalize_false_negative)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ms(secs: i64) -> i64 {
        1_700_000_000_000 + secs * 1000
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms(secs)).unwrap()
    }

    #[test]
    fn test_cluster_from_epoch_millis() {
        let cluster = normalize_cluster(&json!({
            "start": ms(0),
            "end": ms(60),
            "durationSec": 60.0,
            "count": 2,
            "events": [
                {"date": ms(0), "durationSec": 10.0},
                {"date": ms(50), "durationSec": 10.0}
            ],
            "severity": 0.4
        }))
        .unwrap();

        assert_eq!(cluster.start, at(0));
        assert_eq!(cluster.end, at(60));
        assert_eq!(cluster.count, 2);
        assert_eq!(cluster.severity, 0.4);
    }

    #[test]
    fn test_cluster_start_falls_back_to_first_event() {
        let cluster = normalize_cluster(&json!({
            "start": "garbage",
            "events": [
                {"date": "not a date", "durationSec": 10.0},
                {"date": ms(5), "durationSec": 10.0},
                {"date": ms(40), "durationSec": 10.0}
            ]
        }))
        .unwrap();

        assert_eq!(cluster.start, at(5));
        assert_eq!(cluster.end, at(40));
        assert_eq!(cluster.count, 2);
        assert_eq!(cluster.events.len(), 2);
        assert_eq!(cluster.duration_sec, 35.0);
    }

    #[test]
    fn test_cluster_end_falls_back_to_start() {
        let cluster = normalize_cluster(&json!({
            "start": "2024-03-01T23:00:00Z",
            "end": null,
            "events": []
        }))
        .unwrap();

        assert_eq!(cluster.end, cluster.start);
        assert_eq!(cluster.duration_sec, 0.0);
    }

    #[test]
    fn test_unresolvable_cluster_is_discarded() {
        assert!(normalize_cluster(&json!({"start": "", "events": [{"date": "x"}]})).is_none());
        assert!(normalize_cluster(&json!({})).is_none());
    }

    #[test]
    fn test_false_negative_end_falls_back_to_start() {
        let window = normalize_false_negative(&json!({
            "start": ms(10),
            "end": "nope",
            "confidence": 0.93
        }))
        .unwrap();

        assert_eq!(window.end, at(10));
        assert_eq!(window.confidence, 0.93);
        assert!(normalize_false_negative(&json!({"start": null, "end": ms(1)})).is_none());
    }

    #[test]
    fn test_normalize_cluster_is_idempotent() {
        let once = normalize_cluster(&json!({
            "start": "2024-03-01 23:00:00",
            "end": "2024-03-01T23:01:00Z",
            "events": [{"timestamp": "2024-03-01T23:00:00Z", "durationSec": 12.0}],
            "severity": 0.25
        }))
        .unwrap();

        let twice = normalize_cluster(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_false_negative_is_idempotent() {
        let once = normalize_false_negative(&json!({
            "start": "2024-03-01T23:00:00.250Z",
            "end": "2024-03-01T23:01:00Z",
            "durationSec": 59.75,
            "confidence": 0.97
        }))
        .unwrap();

        let twice = normalize_false_negative(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_epoch_millis_round_trip_preserves_instant() {
        let original = Cluster {
            start: Utc.timestamp_millis_opt(1_700_000_123_456).unwrap(),
            end: Utc.timestamp_millis_opt(1_700_000_183_789).unwrap(),
            duration_sec: 60.333,
            count: 1,
            events: vec![AnnotationEvent::new(
                Utc.timestamp_millis_opt(1_700_000_123_456).unwrap(),
                14.0,
            )],
            severity: 0.1,
        };

        let wire = serde_json::to_value(&original).unwrap();
        assert!(wire["start"].is_i64());
        let restored = normalize_cluster(&wire).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_normalize_results_drops_unresolvable_records() {
        let result = normalize_results(&json!({
            "clusters": [
                {"start": ms(0), "end": ms(30), "events": [{"date": ms(0), "durationSec": 30.0}]},
                {"start": "??", "events": []}
            ],
            "falseNegatives": [
                {"start": ms(100), "end": ms(200), "durationSec": 100.0, "confidence": 0.9},
                {"start": {}, "end": ms(300)}
            ]
        }));

        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.false_negatives.len(), 1);
    }

    #[test]
    fn test_normalize_results_tolerates_missing_arrays() {
        assert_eq!(normalize_results(&json!({})), AnalysisResult::default());
    }
}
