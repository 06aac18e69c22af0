//! Filters, severity and the caller-facing cluster shape.

pub mod export;

pub use export::{clusters_to_csv, false_negatives_to_csv, ClusterExportRow};

use crate::clustering::scoring::compute_severity;
use crate::clustering::ClusterParams;
use crate::models::{Cluster, RawCluster};

/// Independent, AND-combined keep/drop predicates.
pub fn passes_filters(cluster: &RawCluster, params: &ClusterParams) -> bool {
    cluster.count >= params.min_count
        && cluster.total_event_secs() >= params.min_total_sec
        && cluster.duration_sec <= params.max_cluster_sec
        && cluster.density_per_min() >= params.min_density
}

pub fn score_cluster(cluster: RawCluster, params: &ClusterParams) -> Cluster {
    let severity = compute_severity(
        cluster.count,
        cluster.density_per_min(),
        cluster.duration_sec,
        &params.severity,
    );

    Cluster {
        start: cluster.start,
        end: cluster.end,
        duration_sec: cluster.duration_sec,
        count: cluster.count,
        events: cluster.events,
        severity,
    }
}

/// Drop clusters failing any filter and attach severity to the rest.
pub fn finalize_clusters(raw: Vec<RawCluster>, params: &ClusterParams) -> Vec<Cluster> {
    raw.into_iter()
        .filter(|c| passes_filters(c, params))
        .map(|c| score_cluster(c, params))
        .collect()
}
