use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::AnalysisResult;
use crate::settings::AnalysisSettings;

use super::loop_worker::{analysis_loop, AnalysisJob};
use super::protocol::{interpret_response, AnalysisRequest};

const JOB_QUEUE_CAPACITY: usize = 16;

/// A submitted request that has not been resolved yet.
#[derive(Debug)]
pub struct PendingAnalysis {
    request_id: String,
    rx: oneshot::Receiver<Value>,
}

impl PendingAnalysis {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the raw response message.
    pub async fn response(self) -> Result<Value> {
        self.rx
            .await
            .map_err(|_| anyhow!("analysis worker terminated before responding"))
    }
}

/// Owns the background analysis worker and tracks which submission is the
/// latest, so results of superseded requests can be discarded.
pub struct AnalysisController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    job_tx: Option<mpsc::Sender<AnalysisJob>>,
    settings: Arc<AnalysisSettings>,
    latest_request: Option<String>,
}

impl AnalysisController {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            handle: None,
            cancel_token: None,
            job_tx: None,
            settings: Arc::new(settings),
            latest_request: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            bail!("analysis worker already running");
        }

        let cancel_token = CancellationToken::new();
        let (job_tx, job_rx) = mpsc::channel(JOB_QUEUE_CAPACITY);
        let handle = tokio::spawn(analysis_loop(
            job_rx,
            Arc::clone(&self.settings),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.job_tx = Some(job_tx);
        info!("analysis worker started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Queue a request under a fresh token. The new token becomes the latest;
    /// anything submitted earlier is stale from now on.
    pub async fn submit(&mut self, request: AnalysisRequest) -> Result<PendingAnalysis> {
        let request_id = Uuid::new_v4().to_string();
        let message = request.to_message(Some(&request_id))?;
        self.enqueue(request_id, message).await
    }

    /// Queue a prebuilt message as is. A string `requestId` on the message is
    /// kept; otherwise one is assigned.
    pub async fn submit_message(&mut self, mut message: Value) -> Result<PendingAnalysis> {
        let request_id = match message.get("requestId").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                if let Value::Object(fields) = &mut message {
                    fields.insert("requestId".to_string(), Value::String(id.clone()));
                }
                id
            }
        };
        self.enqueue(request_id, message).await
    }

    async fn enqueue(&mut self, request_id: String, message: Value) -> Result<PendingAnalysis> {
        let job_tx = self
            .job_tx
            .as_ref()
            .context("analysis worker is not running")?;

        let (reply, rx) = oneshot::channel();
        job_tx
            .send(AnalysisJob { message, reply })
            .await
            .map_err(|_| anyhow!("analysis worker is not accepting requests"))?;

        self.latest_request = Some(request_id.clone());
        Ok(PendingAnalysis { request_id, rx })
    }

    pub fn is_latest(&self, request_id: &str) -> bool {
        self.latest_request.as_deref() == Some(request_id)
    }

    /// Wait for a pending request. Returns `Ok(None)` when a newer request was
    /// submitted in the meantime; failure responses become errors.
    pub async fn resolve(&self, pending: PendingAnalysis) -> Result<Option<AnalysisResult>> {
        let request_id = pending.request_id.clone();
        let response = pending.response().await?;

        if !self.is_latest(&request_id) {
            debug!("discarding stale analysis response {request_id}");
            return Ok(None);
        }

        interpret_response(&response).map(Some)
    }

    /// Submit and wait in one step.
    pub async fn analyze(&mut self, request: AnalysisRequest) -> Result<AnalysisResult> {
        let pending = self.submit(request).await?;
        self.resolve(pending)
            .await?
            .context("analysis superseded by a newer request")
    }

    /// Stop the worker. Pending requests never receive a response.
    pub async fn terminate(&mut self) -> Result<()> {
        self.job_tx = None;
        self.latest_request = None;

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("analysis worker failed to join")
                .map(|_| ())?;
            info!("analysis worker terminated");
        }
        Ok(())
    }

    pub async fn restart(&mut self) -> Result<()> {
        self.terminate().await?;
        self.start()
    }
}
