use crate::clustering::blocks::{build_flow_blocks, high_flow_samples, FlowBlock};
use crate::models::{seconds_between, AnnotationEvent, FalseNegativeWindow, FlowSample};

use super::config::FalseNegativeParams;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Find sustained flow-limitation windows with no overlapping annotation.
///
/// `annotations` is the full extracted stream, not the clustered output.
/// Windows come back in chronological order.
pub fn detect_false_negatives(
    flow: &[FlowSample],
    annotations: &[AnnotationEvent],
    params: &FalseNegativeParams,
) -> Vec<FalseNegativeWindow> {
    let high = high_flow_samples(flow, params.fl_threshold);
    let blocks = build_flow_blocks(&high, params.cluster_gap_sec);
    let candidates = blocks.len();

    let windows: Vec<FalseNegativeWindow> = blocks
        .iter()
        .map(window_from_block)
        .filter(|w| w.duration_sec >= params.min_duration_sec)
        .filter(|w| !annotations.iter().any(|a| a.overlaps(w.start, w.end)))
        .collect();

    log_debug!(
        "false-negative scan: {} high samples, {} candidate windows, {} kept",
        high.len(),
        candidates,
        windows.len()
    );

    windows
}

/// Sample-to-sample span; unlike clusters, no duration is added to the last sample.
fn window_from_block(block: &FlowBlock) -> FalseNegativeWindow {
    let (start, end) = (block.first(), block.last());
    FalseNegativeWindow {
        start,
        end,
        duration_sec: seconds_between(start, end),
        confidence: block.peak(),
    }
}
