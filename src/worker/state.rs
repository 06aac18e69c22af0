use serde::{Deserialize, Serialize};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Lifecycle of one request inside the worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RequestPhase {
    #[default]
    Idle,
    Validating,
    Computing,
    Succeeded,
    Failed,
}

impl RequestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPhase::Idle => "idle",
            RequestPhase::Validating => "validating",
            RequestPhase::Computing => "computing",
            RequestPhase::Succeeded => "succeeded",
            RequestPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestPhase::Succeeded | RequestPhase::Failed)
    }

    fn can_advance_to(&self, next: RequestPhase) -> bool {
        matches!(
            (self, next),
            (RequestPhase::Idle, RequestPhase::Validating)
                | (RequestPhase::Validating, RequestPhase::Computing)
                | (RequestPhase::Validating, RequestPhase::Failed)
                | (RequestPhase::Computing, RequestPhase::Succeeded)
                | (RequestPhase::Computing, RequestPhase::Failed)
        )
    }
}

/// Phase tracker for a single request. Illegal transitions are ignored and
/// reported as `false`, so a terminal phase is never left.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    phase: RequestPhase,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn advance(&mut self, next: RequestPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            log_warn!(
                "ignored request phase transition {} -> {}",
                self.phase.as_str(),
                next.as_str()
            );
            return false;
        }
        log_debug!("request phase {} -> {}", self.phase.as_str(), next.as_str());
        self.phase = next;
        true
    }
}
