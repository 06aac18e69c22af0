//! Flat CSV export of finalized results.
//!
//! Column order is fixed:
//! - clusters: `start,durationSec,count,severity`
//! - false negatives: `start,end,durationSec,confidence`
//!
//! Instants are RFC 3339 UTC with millisecond precision. No field ever needs
//! quoting, so no escaping is done.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{Cluster, FalseNegativeWindow};

pub const CLUSTER_CSV_HEADER: &str = "start,durationSec,count,severity";
pub const FALSE_NEGATIVE_CSV_HEADER: &str = "start,end,durationSec,confidence";

/// One export row per finalized cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterExportRow {
    pub start: DateTime<Utc>,
    pub duration_sec: f64,
    pub count: usize,
    pub severity: f64,
}

impl From<&Cluster> for ClusterExportRow {
    fn from(cluster: &Cluster) -> Self {
        Self {
            start: cluster.start,
            duration_sec: cluster.duration_sec,
            count: cluster.count,
            severity: cluster.severity,
        }
    }
}

fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ClusterExportRow {
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{:.1},{},{:.3}",
            format_instant(&self.start),
            self.duration_sec,
            self.count,
            self.severity
        )
    }
}

pub fn clusters_to_csv(clusters: &[Cluster]) -> String {
    let mut csv = String::with_capacity(64 * (clusters.len() + 1));
    csv.push_str(CLUSTER_CSV_HEADER);
    csv.push('\n');
    for cluster in clusters {
        csv.push_str(&ClusterExportRow::from(cluster).to_csv_line());
        csv.push('\n');
    }
    csv
}

pub fn false_negatives_to_csv(windows: &[FalseNegativeWindow]) -> String {
    let mut csv = String::with_capacity(80 * (windows.len() + 1));
    csv.push_str(FALSE_NEGATIVE_CSV_HEADER);
    csv.push('\n');
    for window in windows {
        csv.push_str(&format!(
            "{},{},{:.1},{:.3}\n",
            format_instant(&window.start),
            format_instant(&window.end),
            window.duration_sec,
            window.confidence
        ));
    }
    csv
}
