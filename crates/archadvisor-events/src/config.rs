//! Event bus configuration.

use std::time::Duration;

/// Events kept per run for replay.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Queue depth per listener. A listener whose queue fills is detached.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// How long a finished run's channel lingers for late observers.
pub const DEFAULT_RETIRE_GRACE: Duration = Duration::from_secs(300);

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    pub history_limit: usize,
    pub subscriber_buffer: usize,
    pub retire_grace: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            retire_grace: DEFAULT_RETIRE_GRACE,
        }
    }
}

impl EventBusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer.max(1);
        self
    }

    pub fn with_retire_grace(mut self, grace: Duration) -> Self {
        self.retire_grace = grace;
        self
    }
}
