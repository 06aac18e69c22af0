use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Thresholds for flagging unannotated flow-limitation episodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FalseNegativeParams {
    /// Flow level floor.
    pub fl_threshold: f64,
    /// Max gap between consecutive samples in one window.
    pub cluster_gap_sec: f64,
    /// Windows shorter than this are discarded.
    pub min_duration_sec: f64,
}

impl Default for FalseNegativeParams {
    fn default() -> Self {
        Self {
            fl_threshold: 0.9,
            cluster_gap_sec: 60.0,
            min_duration_sec: 60.0,
        }
    }
}

impl FalseNegativeParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("flThreshold", self.fl_threshold),
            ("clusterGapSec", self.cluster_gap_sec),
            ("minDurationSec", self.min_duration_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a finite, non-negative number");
            }
        }
        Ok(())
    }
}
