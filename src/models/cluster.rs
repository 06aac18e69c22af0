use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{seconds_between, AnnotationEvent};

/// Cluster as it leaves the clustering engine, before filtering and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCluster {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_sec: f64,
    pub count: usize,
    pub events: Vec<AnnotationEvent>,
}

impl RawCluster {
    /// Build from a closed, timestamp-ordered group of events.
    /// Returns `None` for an empty group.
    pub fn from_events(events: Vec<AnnotationEvent>) -> Option<Self> {
        let first = events.first()?;
        let last = events.last()?;
        let start = first.timestamp;
        let end = last.end().max(start);

        Some(Self {
            start,
            end,
            duration_sec: seconds_between(start, end),
            count: events.len(),
            events,
        })
    }

    /// Sum of member event durations ("annotated seconds").
    pub fn total_event_secs(&self) -> f64 {
        self.events.iter().map(|e| e.duration_sec).sum()
    }

    /// Events per minute over the cluster span. A zero-length span counts as
    /// infinitely dense.
    pub fn density_per_min(&self) -> f64 {
        density_per_min(self.count, self.duration_sec)
    }

    pub fn recompute_duration(&mut self) {
        self.duration_sec = seconds_between(self.start, self.end);
    }
}

pub fn density_per_min(count: usize, duration_sec: f64) -> f64 {
    if duration_sec <= 0.0 {
        return f64::INFINITY;
    }
    count as f64 / (duration_sec / 60.0)
}

/// Finalized, caller-facing cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    pub duration_sec: f64,
    pub count: usize,
    pub events: Vec<AnnotationEvent>,
    pub severity: f64,
}

impl Cluster {
    pub fn density_per_min(&self) -> f64 {
        density_per_min(self.count, self.duration_sec)
    }
}

/// Sustained flow limitation with no overlapping annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FalseNegativeWindow {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    pub duration_sec: f64,
    pub confidence: f64,
}

/// Both result arrays of one analysis request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub clusters: Vec<Cluster>,
    pub false_negatives: Vec<FalseNegativeWindow>,
}

/// Headline numbers for a result, computed on the receiving side.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub cluster_count: usize,
    pub false_negative_count: usize,
    pub clustered_event_count: usize,
    pub longest_cluster_sec: f64,
}

impl AnalysisResult {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            cluster_count: self.clusters.len(),
            false_negative_count: self.false_negatives.len(),
            clustered_event_count: self.clusters.iter().map(|c| c.count).sum(),
            longest_cluster_sec: self
                .clusters
                .iter()
                .map(|c| c.duration_sec)
                .fold(0.0, f64::max),
        }
    }
}
