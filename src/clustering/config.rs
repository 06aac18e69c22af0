use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// How cluster boundaries are pushed outward with flow-limitation evidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExtensionMode {
    /// Attach at most one adjacent high-flow block on each side.
    #[default]
    FlowBlocks,
    /// Enter on `edge_enter`, keep extending while samples stay above `edge_exit`.
    Hysteresis,
    None,
}

/// Weights of the severity score. Each factor is squashed into `[0, 1)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SeverityWeights {
    pub count: f64,
    pub density: f64,
    pub duration: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            count: 0.5,
            density: 0.3,
            duration: 0.2,
        }
    }
}

/// Tunable clustering and filtering thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterParams {
    /// Max gap between one event's end and the next event's start.
    pub gap_sec: f64,

    /// Flow level at or above which a sample counts as "high".
    pub bridge_threshold: f64,

    /// Max gap a high-flow sample may bridge; also the flow block gap.
    pub bridge_sec: f64,

    /// Hysteresis thresholds, used only by `ExtensionMode::Hysteresis`.
    pub edge_enter: f64,
    pub edge_exit: f64,

    pub extension_mode: ExtensionMode,

    /// Filters applied during finalization.
    pub min_count: usize,
    pub min_total_sec: f64,
    pub max_cluster_sec: f64,
    /// Events per minute.
    pub min_density: f64,

    pub severity: SeverityWeights,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            gap_sec: 120.0,
            bridge_threshold: 0.1,
            bridge_sec: 60.0,
            edge_enter: 0.5,
            edge_exit: 0.35,
            extension_mode: ExtensionMode::FlowBlocks,
            min_count: 3,
            min_total_sec: 0.0,
            max_cluster_sec: 3600.0,
            min_density: 0.0,
            severity: SeverityWeights::default(),
        }
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{name} must be a finite, non-negative number");
    }
    Ok(())
}

impl ClusterParams {
    pub fn validate(&self) -> Result<()> {
        check_non_negative("gapSec", self.gap_sec)?;
        check_non_negative("bridgeThreshold", self.bridge_threshold)?;
        check_non_negative("bridgeSec", self.bridge_sec)?;
        check_non_negative("edgeEnter", self.edge_enter)?;
        check_non_negative("edgeExit", self.edge_exit)?;
        check_non_negative("minTotalSec", self.min_total_sec)?;
        check_non_negative("maxClusterSec", self.max_cluster_sec)?;
        check_non_negative("minDensity", self.min_density)?;
        check_non_negative("severity.count", self.severity.count)?;
        check_non_negative("severity.density", self.severity.density)?;
        check_non_negative("severity.duration", self.severity.duration)?;

        if self.edge_exit > self.edge_enter {
            bail!("edgeExit must not exceed edgeEnter");
        }
        Ok(())
    }
}
