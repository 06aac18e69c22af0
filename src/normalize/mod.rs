pub mod instant;
pub mod records;

pub use instant::{to_valid_instant, IntoInstant};
pub use records::{
    normalize_cluster, normalize_event, normalize_false_negative, normalize_results,
};
