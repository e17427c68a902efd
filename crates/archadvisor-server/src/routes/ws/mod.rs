//! WebSocket event stream for a single run.
//!
//! - `protocol` - message types
//! - `connection` - connection lifecycle

mod connection;
mod protocol;

use archadvisor_types::RunId;
use axum::{
    extract::{Path, State, ws::WebSocketUpgrade},
    response::Response,
};

use crate::error::ServerError;
use crate::state::AppState;

pub use protocol::{ClientMessage, ServerMessage};

/// GET /ws/runs/{id} - WebSocket upgrade. Unknown or expired runs get 404
/// before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Response, ServerError> {
    let run_id = RunId::from(run_id);
    state.orchestrator.status(&run_id).await?;
    Ok(ws.on_upgrade(move |socket| connection::handle_socket(socket, state, run_id)))
}
