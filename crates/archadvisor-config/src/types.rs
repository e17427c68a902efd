//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use archadvisor_events::EventBusConfig;
use archadvisor_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default run submissions allowed per client IP per window.
pub const DEFAULT_RUNS_PER_WINDOW: u32 = 10;

/// Default rate-limit window (one hour).
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 3600;

/// Default idle timeout for WebSocket streams.
pub const DEFAULT_WS_IDLE_TIMEOUT_SECS: u64 = 300;

/// Debate rounds used when a request carries no preferences.
pub const DEFAULT_MAX_DEBATE_ROUNDS: u32 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration. Every section is optional; a missing section takes
/// its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchAdvisorConfig {
    pub server: Option<ServerSection>,
    pub store: Option<StoreSection>,
    pub events: Option<EventsSection>,
    pub pipeline: Option<PipelineSection>,
    pub validation: Option<ValidationSection>,
}

impl ArchAdvisorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and check a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ArchAdvisorConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config layer on top of this one. Sections present in
    /// `other` replace ours wholesale.
    pub fn merge(&mut self, other: ArchAdvisorConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.events.is_some() {
            self.events = other.events;
        }
        if other.pipeline.is_some() {
            self.pipeline = other.pipeline;
        }
        if other.validation.is_some() {
            self.validation = other.validation;
        }
    }

    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }

    pub fn events(&self) -> EventsSection {
        self.events.clone().unwrap_or_default()
    }

    pub fn pipeline(&self) -> PipelineSection {
        self.pipeline.clone().unwrap_or_default()
    }

    pub fn validation(&self) -> ValidationSection {
        self.validation.clone().unwrap_or_default()
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        server.bind_address()?;
        if server.runs_per_window == 0 {
            return Err(ConfigError::Invalid(
                "server.runs_per_window must be at least 1".to_string(),
            ));
        }
        if server.rate_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.rate_window_secs must be at least 1".to_string(),
            ));
        }

        if self.store().max_runs == 0 {
            return Err(ConfigError::Invalid(
                "store.max_runs must be at least 1".to_string(),
            ));
        }

        let rounds = self.pipeline().default_max_debate_rounds;
        if !(1..=5).contains(&rounds) {
            return Err(ConfigError::Invalid(format!(
                "pipeline.default_max_debate_rounds must be between 1 and 5, got {rounds}"
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Enable per-IP limits on run submission.
    pub rate_limiting: bool,
    /// Run submissions allowed per client IP within one window.
    pub runs_per_window: u32,
    /// Length of the rate-limit window in seconds.
    pub rate_window_secs: u64,
    /// Enable request logging.
    pub request_logging: bool,
    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,
    /// Seconds a WebSocket stream may sit with no traffic either way.
    pub ws_idle_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            rate_limiting: true,
            runs_per_window: DEFAULT_RUNS_PER_WINDOW,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
            request_logging: true,
            cors_origins: Vec::new(),
            ws_idle_timeout_secs: DEFAULT_WS_IDLE_TIMEOUT_SECS,
        }
    }
}

impl ServerSection {
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind '{}': {e}", self.bind)))
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn ws_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_idle_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Run lifetime in seconds, counted from the last write.
    pub ttl_secs: u64,
    /// LRU capacity.
    pub max_runs: usize,
    /// Length of the recent-runs list.
    pub recent_limit: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            ttl_secs: archadvisor_store::DEFAULT_TTL.as_secs(),
            max_runs: archadvisor_store::DEFAULT_MAX_RUNS,
            recent_limit: archadvisor_store::DEFAULT_RECENT_LIMIT,
        }
    }
}

impl From<&StoreSection> for StoreConfig {
    fn from(section: &StoreSection) -> Self {
        StoreConfig::new()
            .with_ttl(Duration::from_secs(section.ttl_secs))
            .with_max_runs(section.max_runs)
            .with_recent_limit(section.recent_limit)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// `[events]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    /// Events kept per run for replay.
    pub history_limit: usize,
    /// Per-listener queue depth. A full queue detaches the listener.
    pub subscriber_buffer: usize,
    /// Seconds a finished run's stream lingers before it is dropped.
    pub retire_grace_secs: u64,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            history_limit: archadvisor_events::DEFAULT_HISTORY_LIMIT,
            subscriber_buffer: archadvisor_events::DEFAULT_SUBSCRIBER_BUFFER,
            retire_grace_secs: archadvisor_events::DEFAULT_RETIRE_GRACE.as_secs(),
        }
    }
}

impl From<&EventsSection> for EventBusConfig {
    fn from(section: &EventsSection) -> Self {
        EventBusConfig::new()
            .with_history_limit(section.history_limit)
            .with_subscriber_buffer(section.subscriber_buffer)
            .with_retire_grace(Duration::from_secs(section.retire_grace_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub default_max_debate_rounds: u32,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            default_max_debate_rounds: DEFAULT_MAX_DEBATE_ROUNDS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// `[validation]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    /// Directory of domain rule files (`*.json`). Unset means no domain
    /// pattern checks.
    pub domain_rules_dir: Option<PathBuf>,
}
