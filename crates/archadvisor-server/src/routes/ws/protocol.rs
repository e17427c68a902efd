//! WebSocket protocol types.

use archadvisor_types::RunEvent;
use serde::{Deserialize, Serialize};

/// Messages from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Cancel the run this socket watches.
    Cancel,
    /// Keepalive.
    Ping,
}

/// Messages from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Replay of retained events, sent once on connect.
    EventHistory { events: Vec<RunEvent>, count: usize },
    /// One live event.
    Event { event: RunEvent },
    /// Acknowledgement of a client command.
    Info { message: String },
    Pong,
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn history(events: Vec<RunEvent>) -> Self {
        let count = events.len();
        ServerMessage::EventHistory { events, count }
    }

    pub fn info(message: impl Into<String>) -> Self {
        ServerMessage::Info {
            message: message.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
