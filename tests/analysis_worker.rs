use apnea_analyzer_lib::{
    AnalysisController, AnalysisRequest, AnalysisSettings, ClusterParams, FalseNegativeParams,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};

fn at(offset_sec: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap();
    (base + Duration::seconds(offset_sec)).to_rfc3339()
}

fn annotation(kind: &str, offset_sec: i64, duration_sec: f64) -> Value {
    json!({"Event": kind, "DateTime": at(offset_sec), "Data/Duration": duration_sec})
}

fn flow(offset_sec: i64, level: f64) -> Value {
    json!({"Event": "FLG", "DateTime": at(offset_sec), "Data/Duration": level})
}

fn started() -> AnalysisController {
    let mut controller = AnalysisController::new(AnalysisSettings::default());
    controller.start().unwrap();
    controller
}

#[tokio::test]
async fn test_nearby_events_form_one_cluster() {
    let mut controller = started();
    let rows = vec![
        annotation("Obstructive", 0, 10.0),
        annotation("Obstructive", 15, 10.0),
    ];
    let params = ClusterParams {
        gap_sec: 10.0,
        min_count: 2,
        ..Default::default()
    };

    let result = controller
        .analyze(AnalysisRequest::new(rows).with_params(params))
        .await
        .unwrap();

    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].count, 2);
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_distant_events_without_flow_are_filtered_out() {
    let mut controller = started();
    let rows = vec![
        annotation("Obstructive", 0, 10.0),
        annotation("Obstructive", 210, 10.0),
    ];
    let params = ClusterParams {
        gap_sec: 10.0,
        min_count: 2,
        ..Default::default()
    };

    let result = controller
        .analyze(AnalysisRequest::new(rows).with_params(params))
        .await
        .unwrap();

    assert!(result.clusters.is_empty());
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_flow_limitation_bridges_a_long_gap() {
    let mut controller = started();
    let rows = vec![
        annotation("Obstructive", 0, 90.0),
        annotation("Mixed", 200, 10.0),
        flow(150, 0.95),
    ];
    let params = ClusterParams {
        gap_sec: 10.0,
        bridge_threshold: 0.1,
        bridge_sec: 120.0,
        min_count: 2,
        ..Default::default()
    };

    let result = controller
        .analyze(AnalysisRequest::new(rows).with_params(params))
        .await
        .unwrap();

    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].count, 2);
    assert!(result.false_negatives.is_empty());
    controller.terminate().await.unwrap();
}

fn sustained_flow() -> Vec<Value> {
    (0..30).map(|s| flow(1000 + s, 0.2)).collect()
}

fn sensitive_fn_options() -> FalseNegativeParams {
    FalseNegativeParams {
        fl_threshold: 0.1,
        min_duration_sec: 10.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_unannotated_flow_limitation_is_reported() {
    let mut controller = started();
    let request = AnalysisRequest::new(sustained_flow()).with_fn_options(sensitive_fn_options());

    let result = controller.analyze(request).await.unwrap();

    assert_eq!(result.false_negatives.len(), 1);
    let window = &result.false_negatives[0];
    assert_eq!(window.confidence, 0.2);
    assert_eq!(window.start.to_rfc3339(), at(1000));
    assert_eq!(window.end.to_rfc3339(), at(1029));
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_annotation_inside_window_suppresses_it() {
    let mut controller = started();
    let mut rows = sustained_flow();
    rows.push(annotation("ClearAirway", 1012, 8.0));
    let request = AnalysisRequest::new(rows).with_fn_options(sensitive_fn_options());

    let result = controller.analyze(request).await.unwrap();

    assert!(result.false_negatives.is_empty());
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_superseded_response_is_discarded() {
    let mut controller = started();
    let rows = vec![
        annotation("Obstructive", 0, 10.0),
        annotation("Obstructive", 20, 10.0),
        annotation("Obstructive", 40, 10.0),
    ];

    let first = controller
        .submit(AnalysisRequest::new(rows.clone()))
        .await
        .unwrap();
    let second = controller.submit(AnalysisRequest::new(rows)).await.unwrap();
    assert_ne!(first.request_id(), second.request_id());

    assert!(controller.resolve(first).await.unwrap().is_none());
    let latest = controller.resolve(second).await.unwrap().unwrap();
    assert_eq!(latest.clusters.len(), 1);
    assert_eq!(latest.summary().clustered_event_count, 3);
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_protocol_errors_come_back_as_failures() {
    let mut controller = started();

    let pending = controller
        .submit_message(json!({"action": "analyzeDetails"}))
        .await
        .unwrap();
    let response = pending.response().await.unwrap();
    assert_eq!(response["ok"], json!(false));
    assert_eq!(response["error"], json!("missing payload"));
    assert!(response.get("data").is_none());
    assert!(response["requestId"].is_string());

    let pending = controller
        .submit_message(json!({"action": "sleep", "payload": {}}))
        .await
        .unwrap();
    let err = controller.resolve(pending).await.unwrap_err();
    assert_eq!(err.to_string(), "unknown action");

    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_caller_request_id_is_echoed() {
    let mut controller = started();
    let pending = controller
        .submit_message(json!({
            "action": "analyzeDetails",
            "requestId": "night-42",
            "payload": {"detailsData": []}
        }))
        .await
        .unwrap();
    assert_eq!(pending.request_id(), "night-42");

    let response = pending.response().await.unwrap();
    assert_eq!(response["requestId"], json!("night-42"));
    assert_eq!(response["data"], json!({"clusters": [], "falseNegatives": []}));
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_terminate_and_restart() {
    let mut controller = started();
    assert!(controller.is_running());
    assert!(controller.start().is_err());

    controller.terminate().await.unwrap();
    assert!(!controller.is_running());
    assert!(controller.submit(AnalysisRequest::new(Vec::new())).await.is_err());

    controller.restart().await.unwrap();
    let result = controller
        .analyze(AnalysisRequest::new(Vec::new()))
        .await
        .unwrap();
    assert!(result.clusters.is_empty());
    controller.terminate().await.unwrap();
}

#[tokio::test]
async fn test_terminate_mid_request_yields_no_result() {
    let mut controller = started();
    let rows: Vec<Value> = (0..200_000).map(|s| flow(s, 0.95)).collect();

    let pending = controller.submit(AnalysisRequest::new(rows)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    controller.terminate().await.unwrap();

    assert!(pending.response().await.is_err());
    assert!(!controller.is_running());
}
