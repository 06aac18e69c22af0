pub mod cluster;
pub mod event;

pub use cluster::{
    AnalysisResult, AnalysisSummary, Cluster, FalseNegativeWindow, RawCluster,
};
pub use event::{duration_from_secs, seconds_between, AnnotationEvent, FlowSample};
