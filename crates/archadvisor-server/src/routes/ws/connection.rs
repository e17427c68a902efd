//! WebSocket connection lifecycle.

use archadvisor_types::RunId;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::time::Instant;

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// Stream one run's events to the socket.
///
/// Sends the retained history first, then each live event. Closes when the
/// client goes away, when the run's event stream is dropped by the bus, or
/// after the idle timeout with no traffic in either direction.
pub async fn handle_socket(socket: WebSocket, state: AppState, run_id: RunId) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = state.orchestrator.subscribe(&run_id);
    let idle_timeout = state.config.ws_idle_timeout;

    tracing::debug!(
        run_id = %run_id,
        replay = subscription.history.len(),
        "WebSocket connection established"
    );

    let history = std::mem::take(&mut subscription.history);
    if send_message(&mut sender, ServerMessage::history(history))
        .await
        .is_err()
    {
        return;
    }

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    tracing::debug!(run_id = %run_id, "Event stream retired, closing WebSocket");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                if send_message(&mut sender, ServerMessage::Event { event }).await.is_err() {
                    break;
                }
                idle.as_mut().reset(Instant::now() + idle_timeout);
            }

            msg = receiver.next() => {
                idle.as_mut().reset(Instant::now() + idle_timeout);

                // Binary frames are accepted if they hold UTF-8 JSON.
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            let _ = send_message(
                                &mut sender,
                                ServerMessage::error("invalid_message", "Binary data must be UTF-8"),
                            )
                            .await;
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(run_id = %run_id, error = %e, "WebSocket error");
                        break;
                    }
                };

                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => handle_message(msg, &state, &run_id).await,
                    Err(e) => ServerMessage::error("parse_error", format!("Invalid message: {e}")),
                };
                if send_message(&mut sender, reply).await.is_err() {
                    break;
                }
            }

            _ = &mut idle => {
                tracing::info!(run_id = %run_id, "WebSocket connection closed due to idle timeout");
                let _ = send_message(
                    &mut sender,
                    ServerMessage::error("idle_timeout", "Connection closed due to inactivity"),
                )
                .await;
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(run_id = %run_id, "WebSocket connection closed");
}

async fn handle_message(msg: ClientMessage, state: &AppState, run_id: &RunId) -> ServerMessage {
    match msg {
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Cancel => {
            tracing::info!(run_id = %run_id, "Cancellation requested over WebSocket");
            match state.orchestrator.cancel(run_id).await {
                Ok(status) => ServerMessage::info(format!("Cancellation requested (status: {status})")),
                Err(e) => ServerMessage::error("cancel_failed", e.to_string()),
            }
        }
    }
}

/// Send a message over the WebSocket.
pub async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&msg).map_err(axum::Error::new)?;
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(axum::Error::new)
}
