//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use archadvisor_config::{ArchAdvisorConfig, ConfigError};

/// Default port when no bind address is configured.
pub const DEFAULT_PORT: u16 = 8000;

/// Default run submissions per client IP per window.
pub const DEFAULT_RUNS_PER_WINDOW: u32 = archadvisor_config::DEFAULT_RUNS_PER_WINDOW;

/// Default rate-limit window (one hour).
pub const DEFAULT_RATE_WINDOW: Duration =
    Duration::from_secs(archadvisor_config::DEFAULT_RATE_WINDOW_SECS);

/// Default idle timeout for WebSocket streams (5 minutes).
pub const DEFAULT_WS_IDLE_TIMEOUT: Duration =
    Duration::from_secs(archadvisor_config::DEFAULT_WS_IDLE_TIMEOUT_SECS);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable per-IP limits on run submission.
    pub rate_limiting: bool,

    /// Run submissions allowed per client IP within one window.
    pub runs_per_window: u32,

    /// Length of the rate-limit window.
    pub rate_window: Duration,

    /// Enable request logging.
    pub request_logging: bool,

    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,

    /// A WebSocket stream with no traffic either way for this long is closed.
    pub ws_idle_timeout: Duration,

    /// Debate rounds for submissions that carry no preferences.
    pub default_max_debate_rounds: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            rate_limiting: true,
            runs_per_window: DEFAULT_RUNS_PER_WINDOW,
            rate_window: DEFAULT_RATE_WINDOW,
            request_logging: true,
            cors_origins: Vec::new(),
            ws_idle_timeout: DEFAULT_WS_IDLE_TIMEOUT,
            default_max_debate_rounds: archadvisor_config::DEFAULT_MAX_DEBATE_ROUNDS,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded config file.
    pub fn from_config(config: &ArchAdvisorConfig) -> Result<Self, ConfigError> {
        let server = config.server();
        Ok(Self {
            bind_address: server.bind_address()?,
            rate_limiting: server.rate_limiting,
            runs_per_window: server.runs_per_window,
            rate_window: server.rate_window(),
            request_logging: server.request_logging,
            cors_origins: server.cors_origins.clone(),
            ws_idle_timeout: server.ws_idle_timeout(),
            default_max_debate_rounds: config.pipeline().default_max_debate_rounds,
        })
    }

    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_rate_limiting(mut self, enabled: bool) -> Self {
        self.rate_limiting = enabled;
        self
    }

    /// Set the submission quota: `runs` per `window` per client IP.
    pub fn with_run_quota(mut self, runs: u32, window: Duration) -> Self {
        self.runs_per_window = runs;
        self.rate_window = window;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn with_ws_idle_timeout(mut self, timeout: Duration) -> Self {
        self.ws_idle_timeout = timeout;
        self
    }

    pub fn with_default_max_debate_rounds(mut self, rounds: u32) -> Self {
        self.default_max_debate_rounds = rounds;
        self
    }
}
