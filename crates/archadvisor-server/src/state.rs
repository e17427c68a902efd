//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use archadvisor_pipeline::Orchestrator;

use crate::config::ServerConfig;
use crate::ratelimit::RunLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Accepts, runs and answers for runs.
    pub orchestrator: Orchestrator,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Per-IP submission limiter.
    pub limiter: Arc<RunLimiter>,

    /// When the server came up, for `uptime_seconds`.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: ServerConfig) -> Self {
        let limiter = RunLimiter::new(config.runs_per_window, config.rate_window);
        Self {
            orchestrator,
            config: Arc::new(config),
            limiter: Arc::new(limiter),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
