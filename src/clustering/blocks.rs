use chrono::{DateTime, Utc};

use crate::models::{seconds_between, FlowSample, RawCluster};

use super::config::ClusterParams;

/// A run of consecutive high flow-limitation samples.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowBlock {
    pub samples: Vec<FlowSample>,
}

impl FlowBlock {
    pub fn first(&self) -> DateTime<Utc> {
        self.samples[0].timestamp
    }

    pub fn last(&self) -> DateTime<Utc> {
        self.samples[self.samples.len() - 1].timestamp
    }

    pub fn peak(&self) -> f64 {
        self.samples.iter().map(|s| s.level).fold(f64::MIN, f64::max)
    }
}

/// Split an ordered sequence wherever `joins(prev, next)` is false.
/// Shared by annotation grouping, flow blocks and false-negative windows.
pub fn split_on_gaps<T, F>(items: impl IntoIterator<Item = T>, mut joins: F) -> Vec<Vec<T>>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut groups = Vec::new();
    let mut current: Vec<T> = Vec::new();

    for item in items {
        let joined = current.last().map_or(false, |prev| joins(prev, &item));
        if !joined && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
        current.push(item);
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Samples at or above `threshold`, sorted by timestamp.
pub fn high_flow_samples(flow: &[FlowSample], threshold: f64) -> Vec<FlowSample> {
    let mut high: Vec<FlowSample> = flow.iter().copied().filter(|s| s.level >= threshold).collect();
    high.sort_by_key(|s| s.timestamp);
    high
}

/// Merge sorted samples into blocks wherever consecutive gaps are ≤ `max_gap_sec`.
pub fn build_flow_blocks(sorted: &[FlowSample], max_gap_sec: f64) -> Vec<FlowBlock> {
    split_on_gaps(sorted.iter().copied(), |prev, next| {
        seconds_between(prev.timestamp, next.timestamp) <= max_gap_sec
    })
    .into_iter()
    .map(|samples| FlowBlock { samples })
    .collect()
}

/// True when some sorted sample falls within `[from, to]`.
pub fn has_sample_between(sorted: &[FlowSample], from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    let idx = sorted.partition_point(|s| s.timestamp < from);
    sorted.get(idx).map_or(false, |s| s.timestamp <= to)
}

/// Attach at most one flow block before `start` and one after `end`.
/// Both searches use the unextended bounds; the first qualifying block wins.
pub fn extend_with_blocks(cluster: &mut RawCluster, blocks: &[FlowBlock], gap_sec: f64) {
    let (start, end) = (cluster.start, cluster.end);

    let before = blocks
        .iter()
        .find(|b| b.last() <= start && seconds_between(b.last(), start) <= gap_sec);
    let after = blocks
        .iter()
        .find(|b| b.first() >= end && seconds_between(end, b.first()) <= gap_sec);

    if let Some(block) = before {
        cluster.start = block.first();
    }
    if let Some(block) = after {
        cluster.end = block.last();
    }
}

/// Extend outward through the full, sorted flow stream with hysteresis.
///
/// The sample nearest each boundary (within `gap_sec`) must reach
/// `edge_enter`; extension then continues while samples stay at or above
/// `edge_exit` and consecutive gaps stay within `bridge_sec`.
pub fn extend_with_hysteresis(
    cluster: &mut RawCluster,
    sorted_flow: &[FlowSample],
    params: &ClusterParams,
) {
    let (start, end) = (cluster.start, cluster.end);

    let before_idx = sorted_flow.partition_point(|s| s.timestamp < start);
    let mut outward = sorted_flow[..before_idx].iter().rev();
    if let Some(edge) = outward
        .next()
        .filter(|s| s.level >= params.edge_enter && seconds_between(s.timestamp, start) <= params.gap_sec)
    {
        let mut reached = edge.timestamp;
        for sample in outward {
            if sample.level < params.edge_exit
                || seconds_between(sample.timestamp, reached) > params.bridge_sec
            {
                break;
            }
            reached = sample.timestamp;
        }
        cluster.start = reached;
    }

    let after_idx = sorted_flow.partition_point(|s| s.timestamp <= end);
    let mut outward = sorted_flow[after_idx..].iter();
    if let Some(edge) = outward
        .next()
        .filter(|s| s.level >= params.edge_enter && seconds_between(end, s.timestamp) <= params.gap_sec)
    {
        let mut reached = edge.timestamp;
        for sample in outward {
            if sample.level < params.edge_exit
                || seconds_between(reached, sample.timestamp) > params.bridge_sec
            {
                break;
            }
            reached = sample.timestamp;
        }
        cluster.end = reached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnnotationEvent;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, level: f64) -> FlowSample {
        FlowSample::new(at(secs), level)
    }

    fn cluster(start: i64, end: i64) -> RawCluster {
        RawCluster::from_events(vec![AnnotationEvent::new(at(start), (end - start) as f64)]).unwrap()
    }

    #[test]
    fn test_split_on_gaps_groups_runs() {
        let groups = split_on_gaps(vec![1, 2, 3, 10, 11, 30], |a, b| b - a <= 2);
        assert_eq!(groups, vec![vec![1, 2, 3], vec![10, 11], vec![30]]);
    }

    #[test]
    fn test_split_on_gaps_empty() {
        let groups = split_on_gaps(Vec::<i32>::new(), |_, _| true);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_high_flow_samples_filters_and_sorts() {
        let high = high_flow_samples(
            &[sample(30, 0.5), sample(10, 0.05), sample(0, 0.1)],
            0.1,
        );
        assert_eq!(high, vec![sample(0, 0.1), sample(30, 0.5)]);
    }

    #[test]
    fn test_build_flow_blocks() {
        let blocks = build_flow_blocks(
            &[sample(0, 0.5), sample(20, 0.6), sample(200, 0.7), sample(230, 0.9)],
            60.0,
        );
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].first(), at(0));
        assert_eq!(blocks[0].last(), at(20));
        assert_eq!(blocks[1].peak(), 0.9);
    }

    #[test]
    fn test_has_sample_between_is_inclusive() {
        let sorted = [sample(10, 0.5), sample(50, 0.5)];
        assert!(has_sample_between(&sorted, at(10), at(20)));
        assert!(has_sample_between(&sorted, at(20), at(50)));
        assert!(!has_sample_between(&sorted, at(11), at(49)));
        assert!(!has_sample_between(&[], at(0), at(100)));
    }

    #[test]
    fn test_extend_with_blocks_both_sides() {
        let mut c = cluster(100, 160);
        let blocks = build_flow_blocks(
            &[sample(40, 0.5), sample(70, 0.5), sample(200, 0.5), sample(250, 0.5)],
            60.0,
        );

        extend_with_blocks(&mut c, &blocks, 60.0);

        assert_eq!(c.start, at(40));
        assert_eq!(c.end, at(250));
    }

    #[test]
    fn test_extend_with_blocks_ignores_distant_blocks() {
        let mut c = cluster(500, 560);
        let blocks = build_flow_blocks(&[sample(0, 0.5), sample(1000, 0.5)], 60.0);

        extend_with_blocks(&mut c, &blocks, 60.0);

        assert_eq!(c.start, at(500));
        assert_eq!(c.end, at(560));
    }

    #[test]
    fn test_extend_with_blocks_takes_first_match() {
        let mut c = cluster(100, 120);
        // Both blocks end within 60s of the start; the earlier one is found first.
        let blocks = vec![
            FlowBlock { samples: vec![sample(30, 0.5), sample(45, 0.5)] },
            FlowBlock { samples: vec![sample(80, 0.5), sample(90, 0.5)] },
        ];

        extend_with_blocks(&mut c, &blocks, 60.0);

        assert_eq!(c.start, at(30));
    }

    #[test]
    fn test_hysteresis_enters_high_and_exits_low() {
        let params = ClusterParams::default();
        let mut c = cluster(100, 160);
        let flow = [
            sample(40, 0.2),
            sample(60, 0.4),
            sample(80, 0.6),
            sample(170, 0.7),
            sample(190, 0.36),
            sample(210, 0.3),
        ];

        extend_with_hysteresis(&mut c, &flow, &params);

        assert_eq!(c.start, at(60));
        assert_eq!(c.end, at(190));
    }

    #[test]
    fn test_hysteresis_requires_enter_level() {
        let params = ClusterParams::default();
        let mut c = cluster(100, 160);
        let flow = [sample(90, 0.4), sample(170, 0.45)];

        extend_with_hysteresis(&mut c, &flow, &params);

        assert_eq!(c.start, at(100));
        assert_eq!(c.end, at(160));
    }
}
