//! Split raw detail rows into annotation events and flow-limitation samples.
//!
//! Rows that fail classification or parsing are dropped silently; only the
//! aggregate counts are logged.

pub mod classify;
pub mod row;

pub use classify::{ClassificationRules, RowClass};
pub use row::{DetailRow, RowRejection};

use serde_json::Value;

use crate::models::{AnnotationEvent, FlowSample};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Both typed streams. Neither is guaranteed to be sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEvents {
    pub annotations: Vec<AnnotationEvent>,
    pub flow_samples: Vec<FlowSample>,
}

/// Per-reason drop counts. Rows of a kind the rules don't map are counted as
/// unclassified even when they would also fail parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub rows: usize,
    pub annotations: usize,
    pub flow_samples: usize,
    pub unclassified: usize,
    pub invalid_timestamp: usize,
    pub invalid_magnitude: usize,
    /// Annotations whose end instant is past the representable range.
    pub out_of_range: usize,
}

impl ExtractionStats {
    pub fn invalid(&self) -> usize {
        self.invalid_timestamp + self.invalid_magnitude + self.out_of_range
    }

    fn reject(&mut self, rejection: RowRejection) {
        match rejection {
            RowRejection::NotAnObject | RowRejection::MissingType => self.unclassified += 1,
            RowRejection::InvalidTimestamp => self.invalid_timestamp += 1,
            RowRejection::InvalidMagnitude => self.invalid_magnitude += 1,
        }
    }
}

pub fn extract_events(rows: &[Value], rules: &ClassificationRules) -> ExtractedEvents {
    extract_events_with_stats(rows, rules).0
}

pub fn extract_events_with_stats(
    rows: &[Value],
    rules: &ClassificationRules,
) -> (ExtractedEvents, ExtractionStats) {
    let mut extracted = ExtractedEvents::default();
    let mut stats = ExtractionStats {
        rows: rows.len(),
        ..Default::default()
    };

    for value in rows {
        let row = match DetailRow::from_value(value) {
            Ok(row) => row,
            Err(rejection) => {
                let known_kind = row::event_type_of(value)
                    .and_then(|t| rules.classify(t))
                    .is_some();
                if known_kind {
                    stats.reject(rejection);
                } else {
                    stats.unclassified += 1;
                }
                continue;
            }
        };

        let Some(class) = rules.classify(&row.event_type) else {
            stats.unclassified += 1;
            continue;
        };

        match class {
            RowClass::Annotation => {
                let event = AnnotationEvent::new(row.timestamp, row.magnitude);
                // An end instant past the representable range would poison gap math.
                if event
                    .timestamp
                    .checked_add_signed(crate::models::duration_from_secs(event.duration_sec))
                    .is_none()
                {
                    stats.out_of_range += 1;
                    continue;
                }
                extracted.annotations.push(event);
            }
            RowClass::FlowLimitation => {
                extracted
                    .flow_samples
                    .push(FlowSample::new(row.timestamp, row.magnitude));
            }
        }
    }

    stats.annotations = extracted.annotations.len();
    stats.flow_samples = extracted.flow_samples.len();

    log_debug!(
        "extracted {} annotations and {} flow samples from {} rows ({} unclassified, {} bad timestamp, {} bad magnitude, {} out of range)",
        stats.annotations,
        stats.flow_samples,
        stats.rows,
        stats.unclassified,
        stats.invalid_timestamp,
        stats.invalid_magnitude,
        stats.out_of_range
    );

    (extracted, stats)
}
