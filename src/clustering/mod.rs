pub mod algorithm;
pub mod blocks;
pub mod config;
pub mod scoring;

pub use algorithm::cluster_apnea_events;
pub use config::{ClusterParams, ExtensionMode, SeverityWeights};
