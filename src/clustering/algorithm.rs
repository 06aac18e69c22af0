use crate::models::{seconds_between, AnnotationEvent, FlowSample, RawCluster};

use super::blocks::{
    build_flow_blocks, extend_with_blocks, extend_with_hysteresis, has_sample_between,
    high_flow_samples, split_on_gaps,
};
use super::config::{ClusterParams, ExtensionMode};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Main clustering function: annotation events plus flow evidence into raw clusters.
///
/// Clusters come back in chronological order, unfiltered. Filtering and
/// severity belong to finalization.
pub fn cluster_apnea_events(
    events: &[AnnotationEvent],
    flow: &[FlowSample],
    params: &ClusterParams,
) -> Vec<RawCluster> {
    // Edge case: nothing to cluster, whatever the flow data says
    if events.is_empty() {
        return Vec::new();
    }

    // Step 1: Sort annotations. Stable, so duplicates keep arrival order.
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.timestamp);

    // Step 2: High-flow samples and the blocks they form
    let high = high_flow_samples(flow, params.bridge_threshold);
    let blocks = build_flow_blocks(&high, params.bridge_sec);

    // Step 3: Gap/bridge grouping
    let groups = group_annotations(sorted, &high, params);

    // Step 4-6: Raw clusters, boundary extension, duration
    let sorted_flow = match params.extension_mode {
        ExtensionMode::Hysteresis => {
            let mut all = flow.to_vec();
            all.sort_by_key(|s| s.timestamp);
            all
        }
        _ => Vec::new(),
    };

    let clusters: Vec<RawCluster> = groups
        .into_iter()
        .filter_map(RawCluster::from_events)
        .map(|mut cluster| {
            match params.extension_mode {
                ExtensionMode::FlowBlocks => extend_with_blocks(&mut cluster, &blocks, params.gap_sec),
                ExtensionMode::Hysteresis => {
                    extend_with_hysteresis(&mut cluster, &sorted_flow, params)
                }
                ExtensionMode::None => {}
            }
            cluster.recompute_duration();
            cluster
        })
        .collect();

    log_debug!(
        "clustered {} annotations into {} raw clusters ({} high-flow samples, {} flow blocks)",
        events.len(),
        clusters.len(),
        high.len(),
        blocks.len()
    );

    clusters
}

/// Walk sorted events, merging on a short gap or a flow-bridged gap.
pub fn group_annotations(
    sorted: Vec<AnnotationEvent>,
    high_flow: &[FlowSample],
    params: &ClusterParams,
) -> Vec<Vec<AnnotationEvent>> {
    split_on_gaps(sorted, |prev, next| {
        let prev_end = prev.end();
        let gap = seconds_between(prev_end, next.timestamp);

        gap <= params.gap_sec
            || (gap <= params.bridge_sec
                && has_sample_between(high_flow, prev_end, next.timestamp))
    })
}
