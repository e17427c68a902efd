//! Run endpoints.

use std::net::SocketAddr;

use archadvisor_types::{
    Agent, AgentMessage, ErrorRecord, Preferences, Run, RunId, RunOutput, RunRequest, RunStatus,
    RunSummary, TOTAL_STEPS, Timestamp,
};
use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Rough wall-clock estimate quoted on submission.
pub const ESTIMATED_DURATION_SECONDS: u64 = 120;

/// Rough cost estimate quoted on submission.
pub const ESTIMATED_COST_USD: f64 = 0.18;

/// Runs listed when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Most runs a single listing returns.
pub const MAX_LIST_LIMIT: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub requirements: String,
    /// When absent, the server's default debate bound applies.
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub created_at: Timestamp,
    pub websocket_url: String,
    pub estimated_duration_seconds: u64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub current_agent: Option<Agent>,
    pub debate_round: u32,
    pub validation_round: u32,
    pub steps_completed: i32,
    pub total_steps: i32,
}

/// Status view of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatusResponse {
    pub run_id: RunId,
    pub status: RunStatus,
    pub progress: RunProgress,
    pub validation_score: Option<u32>,
    pub messages: Vec<AgentMessage>,
    pub errors: Vec<ErrorRecord>,
    pub cost_so_far_usd: f64,
    pub validation_incomplete: bool,
    pub debate_unresolved: bool,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<Run> for RunStatusResponse {
    fn from(run: Run) -> Self {
        Self {
            progress: RunProgress {
                current_agent: run.status.current_agent(),
                debate_round: run.debate_round,
                validation_round: run.validation_round,
                steps_completed: run.status.steps_completed(),
                total_steps: TOTAL_STEPS,
            },
            validation_score: run.validation_report.as_ref().map(|r| r.score),
            run_id: run.id,
            status: run.status,
            messages: run.messages,
            errors: run.errors,
            cost_so_far_usd: run.total_cost_usd,
            validation_incomplete: run.validation_incomplete,
            debate_unresolved: run.debate_unresolved,
            created_at: run.started_at,
            completed_at: run.completed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListRunsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunsResponse {
    pub runs: Vec<RunSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunResponse {
    pub run_id: RunId,
    pub status: RunStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/runs - Submit requirements and start a run.
pub async fn create_run_handler(
    State(state): State<AppState>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    body: Result<Json<CreateRunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateRunResponse>), ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let preferences = body.preferences.unwrap_or_else(|| {
        Preferences::default().with_max_debate_rounds(state.config.default_max_debate_rounds)
    });
    let request = RunRequest::new(body.requirements).with_preferences(preferences);
    let submitter = connect_info.map(|Extension(ConnectInfo(addr))| addr.ip().to_string());

    let run = state.orchestrator.submit_as(request, submitter).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateRunResponse {
            websocket_url: format!("/ws/runs/{}", run.id),
            run_id: run.id,
            status: run.status,
            created_at: run.started_at,
            estimated_duration_seconds: ESTIMATED_DURATION_SECONDS,
            estimated_cost_usd: ESTIMATED_COST_USD,
        }),
    ))
}

/// GET /api/v1/runs - Recent runs, most recent first.
pub async fn list_runs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<ListRunsResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ServerError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }

    let runs = state.orchestrator.list_recent(limit).await;
    let total = runs.len();
    Ok(Json(ListRunsResponse { runs, total }))
}

/// GET /api/v1/runs/{id} - Status view.
pub async fn get_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatusResponse>, ServerError> {
    let run = state.orchestrator.status(&RunId::from(run_id)).await?;
    Ok(Json(run.into()))
}

/// GET /api/v1/runs/{id}/output - Final document once the run is terminal.
pub async fn get_output_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunOutput>, ServerError> {
    let output = state.orchestrator.output(&RunId::from(run_id)).await?;
    Ok(Json(output))
}

/// POST /api/v1/runs/{id}/cancel - Idempotent cancellation.
pub async fn cancel_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<CancelRunResponse>, ServerError> {
    let run_id = RunId::from(run_id);
    let status = state.orchestrator.cancel(&run_id).await?;
    Ok(Json(CancelRunResponse { run_id, status }))
}
