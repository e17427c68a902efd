//! HTTP/WebSocket client for the ArchAdvisor server.
//!
//! Request and response bodies are the server crate's own wire types, so the
//! two sides cannot drift apart.

use anyhow::{Context as _, Result};
use archadvisor_server::{
    CreateRunRequest, CreateRunResponse, ErrorResponse, HealthResponse, ServerMessage,
    RunStatusResponse,
};
use archadvisor_types::{Preferences, RunEvent, RunOutput};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

/// HTTP/WebSocket client for the ArchAdvisor server.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client for the given server URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {base_url}"))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Check server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    /// Submit requirements and start a run.
    pub async fn submit(
        &self,
        requirements: String,
        preferences: Option<Preferences>,
    ) -> Result<CreateRunResponse> {
        let url = self.base_url.join("/api/v1/runs")?;
        let body = CreateRunRequest {
            requirements,
            preferences,
        };
        let response = self.http.post(url).json(&body).send().await?;
        decode(response).await
    }

    /// Status view of one run.
    pub async fn run_status(&self, run_id: &str) -> Result<RunStatusResponse> {
        let url = self.base_url.join(&format!("/api/v1/runs/{run_id}"))?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    /// Final document of a terminal run.
    pub async fn run_output(&self, run_id: &str) -> Result<RunOutput> {
        let url = self.base_url.join(&format!("/api/v1/runs/{run_id}/output"))?;
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    /// Stream a run's events, calling `on_event` for each, until the run
    /// reaches a terminal event or the server closes the socket.
    pub async fn follow<F>(&self, run_id: &str, mut on_event: F) -> Result<()>
    where
        F: FnMut(&RunEvent),
    {
        let url = self.ws_url(run_id)?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        let (mut write, mut read) = ws.split();

        while let Some(frame) = read.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            match serde_json::from_str::<ServerMessage>(&text)? {
                ServerMessage::EventHistory { events, .. } => {
                    for event in &events {
                        on_event(event);
                    }
                    if events.last().is_some_and(|e| e.kind.is_terminal()) {
                        break;
                    }
                }
                ServerMessage::Event { event } => {
                    on_event(&event);
                    if event.kind.is_terminal() {
                        break;
                    }
                }
                ServerMessage::Error { code, message } => {
                    anyhow::bail!("Server error ({code}): {message}");
                }
                ServerMessage::Info { .. } | ServerMessage::Pong => {}
            }
        }

        let _ = write.send(Message::Close(None)).await;
        Ok(())
    }

    fn ws_url(&self, run_id: &str) -> Result<Url> {
        let mut url = self.base_url.join(&format!("/ws/runs/{run_id}"))?;
        let scheme = if self.base_url.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        url.set_scheme(scheme)
            .map_err(|()| anyhow::anyhow!("Cannot derive a WebSocket URL from {}", self.base_url))?;
        Ok(url)
    }
}

/// Decode a success body, or turn the server's `{code, message}` error body
/// into an error.
async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    match response.json::<ErrorResponse>().await {
        Ok(error) => anyhow::bail!("Server returned {status}: {}", error.message),
        Err(_) => anyhow::bail!("Server returned error: {status}"),
    }
}
