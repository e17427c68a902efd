//! Configuration for the run store.

use std::time::Duration;

/// Default lifetime of a run, measured from its last write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of runs held before LRU eviction.
pub const DEFAULT_MAX_RUNS: usize = 10_000;

/// Default length of the recent-runs list.
pub const DEFAULT_RECENT_LIMIT: usize = 100;

/// Configuration for the run store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live for every run, regardless of status.
    pub ttl: Duration,

    /// Maximum number of runs before the least recently used is evicted.
    pub max_runs: usize,

    /// How many run ids the recent list remembers.
    pub recent_limit: usize,

    /// Interval for the background expiry sweep.
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_runs: DEFAULT_MAX_RUNS,
            recent_limit: DEFAULT_RECENT_LIMIT,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_runs(mut self, max: usize) -> Self {
        self.max_runs = max;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
