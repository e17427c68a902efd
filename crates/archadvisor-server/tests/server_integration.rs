//! End-to-end HTTP tests against a server on an ephemeral port.

mod common;

use std::time::Duration;

use anyhow::Result;
use archadvisor_server::ServerConfig;
use serde_json::Value;

#[tokio::test]
async fn test_server_starts_and_responds_to_health() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.get("/health").send().await?;
    assert!(resp.status().is_success());
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn test_run_completes_and_serves_output() -> Result<()> {
    let server = common::TestServer::start().await?;
    let run_id = server.submit().await?;

    let status = server.wait_terminal(&run_id).await?;
    assert_eq!(status["status"], "complete");
    assert_eq!(status["validation_score"], 100);
    assert_eq!(status["progress"]["steps_completed"], 5);
    assert_eq!(status["progress"]["total_steps"], 5);
    assert_eq!(status["messages"].as_array().map(Vec::len), Some(6));
    assert_eq!(status["validation_incomplete"], false);
    assert_eq!(status["debate_unresolved"], false);

    let output: Value = server
        .get(&format!("/api/v1/runs/{run_id}/output"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(output["status"], "complete");
    assert_eq!(output["markdown"], "# Order platform\n");
    assert_eq!(output["diagrams"][0]["type"], "architecture");
    let cost = output["metadata"]["total_cost_usd"].as_f64().unwrap_or_default();
    assert!(cost > 0.0);

    let list: Value = server.get("/api/v1/runs").send().await?.json().await?;
    assert_eq!(list["runs"][0]["run_id"], run_id.as_str());
    assert_eq!(list["runs"][0]["status"], "complete");

    Ok(())
}

#[tokio::test]
async fn test_output_409_while_running() -> Result<()> {
    let server = common::TestServer::start_with(
        common::slow_orchestrator(Duration::from_millis(400)),
        ServerConfig::new().with_rate_limiting(false),
    )
    .await?;
    let run_id = server.submit().await?;

    let resp = server
        .get(&format!("/api/v1/runs/{run_id}/output"))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 409);

    let cancelled: Value = server
        .post(&format!("/api/v1/runs/{run_id}/cancel"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cancelled["status"], "cancelled");

    let status = server.wait_terminal(&run_id).await?;
    assert_eq!(status["status"], "cancelled");

    Ok(())
}

#[tokio::test]
async fn test_rate_limit_over_real_connections() -> Result<()> {
    let server = common::TestServer::start_with(
        common::happy_orchestrator(),
        ServerConfig::new().with_run_quota(1, Duration::from_secs(60)),
    )
    .await?;

    server.submit().await?;

    let resp = server
        .post("/api/v1/runs")
        .json(&common::run_body())
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 429);
    assert!(resp.headers().contains_key("retry-after"));

    // The rejected submission created nothing.
    let list: Value = server.get("/api/v1/runs").send().await?.json().await?;
    assert_eq!(list["total"], 1);

    Ok(())
}
