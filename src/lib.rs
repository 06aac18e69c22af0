//! Offline analysis of a night of CPAP detail rows: groups apnea annotations
//! into clusters, scores them, and flags sustained flow limitation that no
//! annotation covers. The computation runs on a background worker driven by
//! JSON messages.

pub mod cli;
pub mod clustering;
pub mod extraction;
pub mod false_negatives;
pub mod finalize;
pub mod models;
pub mod normalize;
pub mod settings;
pub mod utils;
pub mod worker;

pub use clustering::{cluster_apnea_events, ClusterParams, ExtensionMode, SeverityWeights};
pub use extraction::{extract_events, ClassificationRules};
pub use false_negatives::{detect_false_negatives, FalseNegativeParams};
pub use finalize::{clusters_to_csv, false_negatives_to_csv};
pub use models::{
    AnalysisResult, AnalysisSummary, AnnotationEvent, Cluster, FalseNegativeWindow, FlowSample,
};
pub use normalize::{normalize_results, to_valid_instant};
pub use settings::{AnalysisSettings, SettingsStore};
pub use worker::{analyze_details, AnalysisController, AnalysisRequest};
