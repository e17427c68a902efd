//! API routes.

pub mod health;
pub mod runs;
pub mod templates;
pub mod ws;

pub use health::{HealthResponse, health_routes};
pub use runs::{
    CancelRunResponse, CreateRunRequest, CreateRunResponse, ListRunsResponse, RunProgress,
    RunStatusResponse, cancel_run_handler, create_run_handler, get_output_handler,
    get_run_handler, list_runs_handler,
};
pub use templates::{TEMPLATES, Template, list_templates_handler};
pub use ws::{ClientMessage, ServerMessage, ws_handler};
