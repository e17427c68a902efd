//! Route tests driven through the router without a socket.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use archadvisor_server::{AppState, Server, ServerConfig};
use archadvisor_types::RunId;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn router(orchestrator: archadvisor_pipeline::Orchestrator, config: ServerConfig) -> Router {
    Server::from_state(AppState::new(orchestrator, config.with_request_logging(false))).router()
}

fn app() -> Router {
    router(
        common::happy_orchestrator(),
        ServerConfig::new().with_rate_limiting(false),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_from(ip: [u8; 4], body: &Value) -> Request<Body> {
    let mut request = post_json("/api/v1/runs", body);
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!body["version"].as_str().unwrap().is_empty());
    assert!(body["uptime_seconds"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_templates() {
    let (status, _, body) = send(&app(), get("/api/v1/templates")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        ["notification_system", "payment_gateway", "chat_platform", "data_pipeline"]
    );
}

#[tokio::test]
async fn test_submit_accepted() {
    let (status, _, body) = send(&app(), post_json("/api/v1/runs", &common::run_body())).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let run_id = body["run_id"].as_str().unwrap();
    assert!(run_id.starts_with("arch_"));
    assert_eq!(run_id.len(), "arch_".len() + 8);
    assert_eq!(body["status"], "initializing");
    assert_eq!(body["websocket_url"], format!("/ws/runs/{run_id}"));
    assert_eq!(body["estimated_duration_seconds"], 120);
    assert_eq!(body["estimated_cost_usd"], 0.18);
}

#[tokio::test]
async fn test_submit_rejects_bad_input() {
    let app = app();

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/runs", &json!({"requirements": "too short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("between 50 and 10000"));

    let mut body = common::run_body();
    body["preferences"] = json!({"max_debate_rounds": 9});
    let (status, _, _) = send(&app, post_json("/api/v1/runs", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/v1/runs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_missing_preferences_use_configured_debate_bound() {
    let orchestrator = common::happy_orchestrator();
    let app = router(
        orchestrator.clone(),
        ServerConfig::new()
            .with_rate_limiting(false)
            .with_default_max_debate_rounds(1),
    );

    let (_, _, body) = send(&app, post_json("/api/v1/runs", &common::run_body())).await;
    let run_id = RunId::from(body["run_id"].as_str().unwrap());
    let run = orchestrator.status(&run_id).await.unwrap();
    assert_eq!(run.preferences.max_debate_rounds, 1);

    let mut explicit = common::run_body();
    explicit["preferences"] = json!({"max_debate_rounds": 4, "cloud_provider": "gcp"});
    let (_, _, body) = send(&app, post_json("/api/v1/runs", &explicit)).await;
    let run_id = RunId::from(body["run_id"].as_str().unwrap());
    let run = orchestrator.status(&run_id).await.unwrap();
    assert_eq!(run.preferences.max_debate_rounds, 4);
}

#[tokio::test]
async fn test_list_limit_bounds() {
    let app = app();
    for _ in 0..3 {
        send(&app, post_json("/api/v1/runs", &common::run_body())).await;
    }

    let (status, _, body) = send(&app, get("/api/v1/runs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let (_, _, body) = send(&app, get("/api/v1/runs?limit=2")).await;
    assert_eq!(body["runs"].as_array().unwrap().len(), 2);

    let (status, _, _) = send(&app, get("/api/v1/runs?limit=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, get("/api/v1/runs?limit=101")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_run_is_404() {
    let app = app();
    for uri in [
        "/api/v1/runs/arch_00000000",
        "/api/v1/runs/arch_00000000/output",
    ] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["code"], "not_found");
    }

    let (status, _, _) = send(
        &app,
        post_json("/api/v1/runs/arch_00000000/cancel", &Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_output_conflict_then_cancel() {
    let app = router(
        common::slow_orchestrator(Duration::from_millis(500)),
        ServerConfig::new().with_rate_limiting(false),
    );

    let (_, _, body) = send(&app, post_json("/api/v1/runs", &common::run_body())).await;
    let run_id = body["run_id"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, get(&format!("/api/v1/runs/{run_id}/output"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let cancel = format!("/api/v1/runs/{run_id}/cancel");
    let (status, _, body) = send(&app, post_json(&cancel, &Value::Null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // Idempotent.
    let (_, _, body) = send(&app, post_json(&cancel, &Value::Null)).await;
    assert_eq!(body["status"], "cancelled");

    let (status, _, body) = send(&app, get(&format!("/api/v1/runs/{run_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["progress"]["steps_completed"], -1);

    let (status, _, body) = send(&app, get(&format!("/api/v1/runs/{run_id}/output"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn test_submission_rate_limited_per_ip() {
    let app = router(
        common::happy_orchestrator(),
        ServerConfig::new().with_run_quota(2, Duration::from_secs(3600)),
    );
    let body = common::run_body();

    for _ in 0..2 {
        let (status, _, _) = send(&app, post_from([10, 0, 0, 1], &body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, headers, error) = send(&app, post_from([10, 0, 0, 1], &body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error["code"], "rate_limit_exceeded");
    let retry: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!(retry > 0 && retry <= 1800);

    // Other clients and other routes are unaffected.
    let (status, _, _) = send(&app, post_from([10, 0, 0, 2], &body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _, _) = send(&app, get("/api/v1/runs")).await;
    assert_eq!(status, StatusCode::OK);
}
