pub mod controller;
pub mod handler;
pub mod loop_worker;
pub mod protocol;
pub mod state;

pub use controller::{AnalysisController, PendingAnalysis};
pub use handler::{analyze_details, handle_message};
pub use loop_worker::AnalysisJob;
pub use protocol::{
    interpret_response, merge_params, validate_message, AnalysisRequest, ProtocolError,
    ANALYSIS_FAILED, ANALYZE_DETAILS,
};
pub use state::{RequestPhase, RequestState};
