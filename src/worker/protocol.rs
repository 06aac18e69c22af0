//! Message contract between the caller and the analysis worker.
//!
//! Request:
//! `{ action: "analyzeDetails", payload: { detailsData, params, fnOptions }, requestId? }`
//!
//! Response:
//! `{ ok: true, data: { clusters, falseNegatives }, requestId? }` or
//! `{ ok: false, error, requestId? }`
//!
//! Both travel as plain `serde_json::Value` so nothing is shared across the
//! boundary.

use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use log::error;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::clustering::ClusterParams;
use crate::extraction::ClassificationRules;
use crate::false_negatives::FalseNegativeParams;
use crate::models::AnalysisResult;
use crate::normalize::normalize_results;

pub const ANALYZE_DETAILS: &str = "analyzeDetails";

/// Failure text for anything that went wrong after validation.
pub const ANALYSIS_FAILED: &str = "analysis failed";

/// Rejections raised before any computation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    MissingAction,
    UnknownAction,
    MissingPayload,
    DetailsNotArray,
}

impl ProtocolError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::MissingAction => "missing action",
            ProtocolError::UnknownAction => "unknown action",
            ProtocolError::MissingPayload => "missing payload",
            ProtocolError::DetailsNotArray => "detailsData must be an array",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ProtocolError {}

/// A request that passed validation. Parameter objects are still raw; they
/// are merged onto the engine defaults by the handler.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub request_id: Option<Value>,
    pub rows: Vec<Value>,
    pub params: Option<Value>,
    pub fn_options: Option<Value>,
    pub classification: Option<Value>,
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

pub fn request_id_of(message: &Value) -> Option<Value> {
    present(message.get("requestId")).cloned()
}

/// Fail fast on malformed messages. Takes ownership so row data moves
/// instead of being copied.
pub fn validate_message(message: Value) -> Result<ValidatedRequest, ProtocolError> {
    let request_id = request_id_of(&message);

    let Value::Object(mut message) = message else {
        return Err(ProtocolError::MissingAction);
    };

    match message.get("action").and_then(Value::as_str) {
        None | Some("") => return Err(ProtocolError::MissingAction),
        Some(ANALYZE_DETAILS) => {}
        Some(_) => return Err(ProtocolError::UnknownAction),
    }

    let mut payload = match message.remove("payload") {
        Some(Value::Object(payload)) => payload,
        _ => return Err(ProtocolError::MissingPayload),
    };

    let rows = match payload.remove("detailsData") {
        Some(Value::Array(rows)) => rows,
        _ => return Err(ProtocolError::DetailsNotArray),
    };

    let mut take = |key: &str| payload.remove(key).filter(|v| !v.is_null());

    Ok(ValidatedRequest {
        request_id,
        rows,
        params: take("params"),
        fn_options: take("fnOptions"),
        classification: take("classification"),
    })
}

fn merge_objects(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if value.is_null() {
            continue;
        }
        if let (Some(Value::Object(inner)), Value::Object(nested)) = (base.get_mut(key), value) {
            merge_objects(inner, nested);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Overlay caller-supplied options onto `defaults`. Missing and `null` keys
/// keep the default; nothing carries over between calls.
pub fn merge_params<T>(defaults: &T, overrides: Option<&Value>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_json::to_value(defaults).context("failed to serialize defaults")?;

    match (overrides, &mut merged) {
        (None, _) => {}
        (Some(Value::Object(over)), Value::Object(base)) => merge_objects(base, over),
        (Some(_), _) => bail!("parameters must be an object"),
    }

    serde_json::from_value(merged).context("invalid analysis parameters")
}

/// Caller-side builder for an `analyzeDetails` message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub details_data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ClusterParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fn_options: Option<FalseNegativeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationRules>,
}

impl AnalysisRequest {
    pub fn new(details_data: Vec<Value>) -> Self {
        Self {
            details_data,
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: ClusterParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_fn_options(mut self, fn_options: FalseNegativeParams) -> Self {
        self.fn_options = Some(fn_options);
        self
    }

    pub fn to_message(&self, request_id: Option<&str>) -> Result<Value> {
        let mut message = json!({
            "action": ANALYZE_DETAILS,
            "payload": serde_json::to_value(self).context("failed to serialize request")?,
        });
        if let Some(id) = request_id {
            message["requestId"] = Value::String(id.to_string());
        }
        Ok(message)
    }
}

/// Success envelope around `data`. A payload that cannot be serialized turns
/// into the generic failure instead.
pub fn success_response<T: Serialize>(data: &T, request_id: Option<Value>) -> Value {
    match serde_json::to_value(data) {
        Ok(data) => with_request_id(json!({ "ok": true, "data": data }), request_id),
        Err(err) => {
            error!("failed to serialize analysis result: {err}");
            failure_response(ANALYSIS_FAILED, request_id)
        }
    }
}

pub fn failure_response(error: &str, request_id: Option<Value>) -> Value {
    with_request_id(json!({ "ok": false, "error": error }), request_id)
}

fn with_request_id(mut response: Value, request_id: Option<Value>) -> Value {
    if let Some(id) = request_id {
        response["requestId"] = id;
    }
    response
}

/// Turn a response into typed results, normalizing every instant.
pub fn interpret_response(response: &Value) -> Result<AnalysisResult> {
    match response.get("ok").and_then(Value::as_bool) {
        Some(true) => {
            let data = response
                .get("data")
                .ok_or_else(|| anyhow!("success response without data"))?;
            Ok(normalize_results(data))
        }
        Some(false) => {
            let error = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(ANALYSIS_FAILED);
            bail!("{error}")
        }
        None => bail!("malformed analysis response"),
    }
}
