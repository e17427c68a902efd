//! HTTP API and WebSocket server for ArchAdvisor.
//!
//! Runs are submitted and queried over REST under `/api/v1`; each run's
//! events stream over `/ws/runs/{id}`. Submission is limited per client IP.
//!
//! # Example
//!
//! ```ignore
//! use archadvisor_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:8000".parse()?);
//! Server::new(orchestrator, config).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use ratelimit::{RunLimiter, rate_limit_middleware, request_logging_middleware};
pub use routes::{
    CancelRunResponse, ClientMessage, CreateRunRequest, CreateRunResponse, HealthResponse,
    ListRunsResponse, RunStatusResponse, ServerMessage, TEMPLATES, Template,
};
pub use state::AppState;

use std::net::SocketAddr;

use archadvisor_pipeline::Orchestrator;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The ArchAdvisor HTTP/WebSocket server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(orchestrator: Orchestrator, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(orchestrator, config),
        }
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .route("/ws/runs/{id}", get(routes::ws_handler))
            .nest("/api/v1", self.api_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    /// API routes (v1). Only submission is rate limited.
    fn api_routes(&self) -> Router<AppState> {
        let submit = post(routes::create_run_handler).route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            ratelimit::rate_limit_middleware,
        ));

        Router::new()
            .route("/templates", get(routes::list_templates_handler))
            .route("/runs", get(routes::list_runs_handler).merge(submit))
            .route("/runs/{id}", get(routes::get_run_handler))
            .route("/runs/{id}/output", get(routes::get_output_handler))
            .route("/runs/{id}/cancel", post(routes::cancel_run_handler))
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return None;
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed))
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Bind the configured address and serve until interrupted.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (tests bind port 0).
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Listener has no address: {e}")))?;
        let router = self.router();

        let limiter = self.state.limiter.clone();
        let period = self.state.config.rate_window;
        let housekeeping = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                limiter.housekeep();
            }
        });

        info!("Starting server on {}", addr);

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Internal(format!("Server error: {e}")));

        housekeeping.abort();
        info!("Server stopped");
        result
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
