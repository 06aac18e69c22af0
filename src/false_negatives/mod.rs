pub mod config;
pub mod detector;

pub use config::FalseNegativeParams;
pub use detector::detect_false_negatives;
