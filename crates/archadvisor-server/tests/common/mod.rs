//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use archadvisor_events::EventBus;
use archadvisor_pipeline::Orchestrator;
use archadvisor_pipeline::testing::{self, ScriptedHandler};
use archadvisor_server::{AppState, Server, ServerConfig};
use archadvisor_store::RunStore;
use archadvisor_types::RunId;
use archadvisor_validate::ValidationEngine;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use archadvisor_pipeline::StepOutput;

/// Orchestrator whose architect and reviewer follow the given scripts.
pub fn orchestrator(architect: ScriptedHandler, reviewer: ScriptedHandler) -> Orchestrator {
    orchestrator_on(EventBus::default(), architect, reviewer)
}

pub fn orchestrator_on(
    bus: EventBus,
    architect: ScriptedHandler,
    reviewer: ScriptedHandler,
) -> Orchestrator {
    Orchestrator::new(
        RunStore::default(),
        bus,
        Arc::new(ValidationEngine::new()),
        testing::handlers(Arc::new(architect), Arc::new(reviewer)),
    )
}

/// Orchestrator whose runs pass validation and review on the first try.
pub fn happy_orchestrator() -> Orchestrator {
    happy_orchestrator_on(EventBus::default())
}

pub fn happy_orchestrator_on(bus: EventBus) -> Orchestrator {
    orchestrator_on(
        bus,
        ScriptedHandler::always("architect", StepOutput::design(testing::passing_design())),
        ScriptedHandler::always("reviewer", StepOutput::review(testing::proceed_review())),
    )
}

/// Orchestrator whose architect takes `delay` per call, leaving time to
/// observe or cancel a running run.
pub fn slow_orchestrator(delay: Duration) -> Orchestrator {
    orchestrator(
        ScriptedHandler::always("architect", StepOutput::design(testing::passing_design()))
            .with_delay(delay),
        ScriptedHandler::always("reviewer", StepOutput::review(testing::proceed_review())),
    )
}

pub fn run_body() -> Value {
    json!({ "requirements": testing::REQUIREMENTS })
}

/// A test server that runs in the background.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub orchestrator: Orchestrator,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(happy_orchestrator(), ServerConfig::new().with_rate_limiting(false))
            .await
    }

    pub async fn start_with(orchestrator: Orchestrator, config: ServerConfig) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = config.with_bind_address(addr).with_request_logging(false);
        let server = Server::from_state(AppState::new(orchestrator.clone(), config));
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            orchestrator,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Submit the standard requirements and return the run id.
    pub async fn submit(&self) -> Result<String> {
        let resp = self.post("/api/v1/runs").json(&run_body()).send().await?;
        anyhow::ensure!(resp.status().as_u16() == 202, "submit returned {}", resp.status());
        let body: Value = resp.json().await?;
        Ok(body["run_id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no run_id in {body}"))?
            .to_string())
    }

    /// Poll the status view until the run is terminal.
    pub async fn wait_terminal(&self, run_id: &str) -> Result<Value> {
        let path = format!("/api/v1/runs/{run_id}");
        timeout(Duration::from_secs(5), async {
            loop {
                let body: Value = self.get(&path).send().await?.json().await?;
                if matches!(
                    body["status"].as_str(),
                    Some("complete" | "error" | "cancelled")
                ) {
                    return Ok(body);
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("run {run_id} did not finish"))?
    }
}

/// Wait until the run's terminal event has been published. The store turns
/// terminal a moment before the closing event goes out.
pub async fn wait_events_settled(orchestrator: &Orchestrator, run_id: &str) -> Result<()> {
    let run_id = RunId::from(run_id);
    timeout(Duration::from_secs(5), async {
        while !orchestrator
            .bus()
            .history(&run_id)
            .last()
            .is_some_and(|e| e.kind.is_terminal())
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("no terminal event for {run_id}"))
}

async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
