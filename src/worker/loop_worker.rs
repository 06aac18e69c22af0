use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::settings::AnalysisSettings;

use super::handler::handle_message;
use super::protocol::{failure_response, request_id_of, ANALYSIS_FAILED};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// One queued request and the channel its response goes back on.
#[derive(Debug)]
pub struct AnalysisJob {
    pub message: Value,
    pub reply: oneshot::Sender<Value>,
}

/// Serve jobs one at a time until the channel closes or the token fires.
///
/// The computation itself runs on the blocking pool. Cancellation while a job
/// is in flight drops its reply sender, so the caller sees no response rather
/// than a partial one.
pub async fn analysis_loop(
    mut jobs: mpsc::Receiver<AnalysisJob>,
    settings: Arc<AnalysisSettings>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            job = jobs.recv() => {
                let Some(AnalysisJob { message, reply }) = job else {
                    log_info!("analysis channel closed; worker exiting");
                    break;
                };

                let request_id = request_id_of(&message);
                let job_settings = Arc::clone(&settings);
                let task = tokio::task::spawn_blocking(move || handle_message(message, &job_settings));

                tokio::select! {
                    joined = task => {
                        let response = match joined {
                            Ok(response) => response,
                            Err(err) => {
                                log_error!("analysis task aborted: {err}");
                                failure_response(ANALYSIS_FAILED, request_id)
                            }
                        };
                        if reply.send(response).is_err() {
                            log_debug!("caller went away before the response was ready");
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("analysis worker terminated mid-request");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("analysis worker shutting down");
                break;
            }
        }
    }
}
