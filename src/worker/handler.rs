use anyhow::{Context, Result};
use serde_json::Value;

use crate::clustering::{cluster_apnea_events, ClusterParams};
use crate::extraction::{extract_events_with_stats, ClassificationRules};
use crate::false_negatives::{detect_false_negatives, FalseNegativeParams};
use crate::finalize::finalize_clusters;
use crate::models::AnalysisResult;
use crate::settings::AnalysisSettings;

use super::protocol::{
    failure_response, merge_params, request_id_of, success_response, validate_message,
    ValidatedRequest, ANALYSIS_FAILED,
};
use super::state::{RequestPhase, RequestState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Run extraction, clustering, finalization and false-negative detection
/// synchronously. Pure; no I/O and no shared state.
pub fn analyze_details(
    rows: &[Value],
    params: &ClusterParams,
    fn_params: &FalseNegativeParams,
    rules: &ClassificationRules,
) -> Result<AnalysisResult> {
    params.validate().context("cluster parameters rejected")?;
    fn_params
        .validate()
        .context("false-negative parameters rejected")?;

    let (extracted, stats) = extract_events_with_stats(rows, rules);
    if stats.invalid() > 0 {
        log_debug!(
            "dropped {} rows: {} bad timestamp, {} bad magnitude, {} out of range",
            stats.invalid(),
            stats.invalid_timestamp,
            stats.invalid_magnitude,
            stats.out_of_range
        );
    }

    let raw = cluster_apnea_events(&extracted.annotations, &extracted.flow_samples, params);
    let raw_count = raw.len();
    let clusters = finalize_clusters(raw, params);

    let false_negatives =
        detect_false_negatives(&extracted.flow_samples, &extracted.annotations, fn_params);

    log_info!(
        "analysis complete: {} rows, {} of {} clusters kept, {} false negatives",
        stats.rows,
        clusters.len(),
        raw_count,
        false_negatives.len()
    );

    Ok(AnalysisResult {
        clusters,
        false_negatives,
    })
}

fn compute(request: &ValidatedRequest, settings: &AnalysisSettings) -> Result<AnalysisResult> {
    let params: ClusterParams = merge_params(&settings.cluster, request.params.as_ref())?;
    let fn_params: FalseNegativeParams =
        merge_params(&settings.false_negatives, request.fn_options.as_ref())?;
    let rules: ClassificationRules =
        merge_params(&settings.classification, request.classification.as_ref())?;

    analyze_details(&request.rows, &params, &fn_params, &rules)
}

/// Handle one request message end to end and build its response message.
///
/// Never fails: protocol problems and computation errors both come back as
/// `{ ok: false, error }` with a fixed, display-safe message.
pub fn handle_message(message: Value, settings: &AnalysisSettings) -> Value {
    let mut state = RequestState::new();
    let response = process(message, settings, &mut state);

    if !state.phase().is_terminal() {
        log_error!("request finished in non-terminal phase {}", state.phase().as_str());
        return failure_response(ANALYSIS_FAILED, request_id_of(&response));
    }
    log_debug!("request finished: {}", state.phase().as_str());
    response
}

fn process(message: Value, settings: &AnalysisSettings, state: &mut RequestState) -> Value {
    let request_id = request_id_of(&message);
    if !state.advance(RequestPhase::Validating) {
        return failure_response(ANALYSIS_FAILED, request_id);
    }

    let request = match validate_message(message) {
        Ok(request) => request,
        Err(err) => {
            log_warn!("request rejected during {}: {}", state.phase().as_str(), err);
            state.advance(RequestPhase::Failed);
            return failure_response(err.as_str(), request_id);
        }
    };

    if !state.advance(RequestPhase::Computing) {
        return failure_response(ANALYSIS_FAILED, request.request_id);
    }
    log_debug!("computing analysis over {} rows", request.rows.len());

    match compute(&request, settings) {
        Ok(result) => {
            state.advance(RequestPhase::Succeeded);
            success_response(&result, request.request_id)
        }
        Err(err) => {
            state.advance(RequestPhase::Failed);
            log_error!("analysis failed: {err:#}");
            failure_response(ANALYSIS_FAILED, request.request_id)
        }
    }
}
