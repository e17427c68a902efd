//! Write-time tracking for run expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use archadvisor_types::RunId;

/// Remembers when each run was last written.
#[derive(Debug)]
pub struct TtlTracker {
    written_at: HashMap<RunId, Instant>,
    ttl: Duration,
}

impl TtlTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            written_at: HashMap::new(),
            ttl,
        }
    }

    /// Record a write (restarts the run's TTL).
    pub fn touch(&mut self, run_id: &RunId) {
        self.written_at.insert(run_id.clone(), Instant::now());
    }

    /// Untracked runs count as expired.
    pub fn is_expired(&self, run_id: &RunId) -> bool {
        match self.written_at.get(run_id) {
            None => true,
            Some(at) => at.elapsed() > self.ttl,
        }
    }

    pub fn remove(&mut self, run_id: &RunId) {
        self.written_at.remove(run_id);
    }

    /// Remove all expired entries and return their ids.
    pub fn drain_expired(&mut self) -> Vec<RunId> {
        let now = Instant::now();
        let ttl = self.ttl;
        let expired: Vec<RunId> = self
            .written_at
            .iter()
            .filter(|(_, at)| now.duration_since(**at) > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.written_at.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.written_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written_at.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn id(s: &str) -> RunId {
        RunId::from(s)
    }

    #[test]
    fn test_touch_restarts_timer() {
        let mut tracker = TtlTracker::new(Duration::from_millis(50));
        tracker.touch(&id("arch_00000001"));
        thread::sleep(Duration::from_millis(30));
        tracker.touch(&id("arch_00000001"));
        thread::sleep(Duration::from_millis(30));
        assert!(!tracker.is_expired(&id("arch_00000001")));
    }

    #[test]
    fn test_expiration() {
        let mut tracker = TtlTracker::new(Duration::from_millis(10));
        tracker.touch(&id("arch_00000001"));
        thread::sleep(Duration::from_millis(20));
        assert!(tracker.is_expired(&id("arch_00000001")));
    }

    #[test]
    fn test_drain_expired() {
        let mut tracker = TtlTracker::new(Duration::from_millis(10));
        tracker.touch(&id("arch_00000001"));
        tracker.touch(&id("arch_00000002"));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(tracker.drain_expired().len(), 2);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_untracked_is_expired() {
        let mut tracker = TtlTracker::new(Duration::from_secs(60));
        tracker.touch(&id("arch_00000001"));
        tracker.remove(&id("arch_00000001"));
        assert_eq!(tracker.len(), 0);
        assert!(tracker.is_expired(&id("arch_00000001")));
    }
}
