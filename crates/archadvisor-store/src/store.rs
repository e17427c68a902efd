//! Run store with LRU capacity and TTL expiry.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use archadvisor_types::{AgentMessage, Run, RunId, RunPatch, RunSummary};
use lru::LruCache;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::ttl::TtlTracker;

struct StoreInner {
    runs: LruCache<RunId, Run>,
    ttl: TtlTracker,
    /// Most recent first.
    recent: VecDeque<RunId>,
}

impl StoreInner {
    /// Drop a run if its TTL ran out. Returns true when it was dropped.
    fn evict_if_expired(&mut self, run_id: &RunId) -> bool {
        if !self.runs.contains(run_id) || !self.ttl.is_expired(run_id) {
            return false;
        }
        debug!(run_id = %run_id, "Run expired, removing from store");
        self.runs.pop(run_id);
        self.ttl.remove(run_id);
        true
    }
}

/// Keyed run persistence shared by every run loop in the process.
///
/// Every run expires a fixed TTL after its last write, whatever its status.
/// Reads of an expired run return [`StoreError::NotFound`]. Updates are
/// typed [`RunPatch`]es applied under the write lock, so concurrent patches
/// to one run serialize and none is lost.
#[derive(Clone)]
pub struct RunStore {
    inner: Arc<RwLock<StoreInner>>,
    config: StoreConfig,
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl RunStore {
    pub fn new(config: StoreConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_runs).unwrap_or(NonZeroUsize::MIN);
        let inner = StoreInner {
            runs: LruCache::new(cap),
            ttl: TtlTracker::new(config.ttl),
            recent: VecDeque::new(),
        };
        Self {
            inner: Arc::new(RwLock::new(inner)),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of runs held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.runs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.runs.is_empty()
    }

    /// Insert a new run. The least recently used run is evicted at capacity.
    pub async fn create(&self, run: Run) -> Result<()> {
        let mut inner = self.inner.write().await;
        let run_id = run.id.clone();

        inner.evict_if_expired(&run_id);
        if inner.runs.contains(&run_id) {
            return Err(StoreError::AlreadyExists(run_id));
        }

        if let Some((evicted, _)) = inner.runs.push(run_id.clone(), run) {
            debug!(run_id = %evicted, "Evicting LRU run to make room");
            inner.ttl.remove(&evicted);
        }
        inner.ttl.touch(&run_id);

        inner.recent.retain(|id| id != &run_id);
        inner.recent.push_front(run_id.clone());
        inner.recent.truncate(self.config.recent_limit);

        trace!(run_id = %run_id, size = inner.runs.len(), "Run created");
        Ok(())
    }

    /// Snapshot of a run.
    pub async fn get(&self, run_id: &RunId) -> Result<Run> {
        let mut inner = self.inner.write().await;
        if inner.evict_if_expired(run_id) {
            return Err(StoreError::NotFound(run_id.clone()));
        }
        inner
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(run_id.clone()))
    }

    /// Apply a patch atomically and return the updated run.
    ///
    /// A terminal run rejects any non-empty patch with
    /// [`StoreError::Terminal`]; an empty patch reads it back unchanged.
    pub async fn update(&self, run_id: &RunId, patch: RunPatch) -> Result<Run> {
        let mut inner = self.inner.write().await;
        if inner.evict_if_expired(run_id) {
            return Err(StoreError::NotFound(run_id.clone()));
        }
        let Some(run) = inner.runs.get_mut(run_id) else {
            return Err(StoreError::NotFound(run_id.clone()));
        };

        if patch.is_empty() {
            return Ok(run.clone());
        }
        if run.is_terminal() {
            warn!(run_id = %run_id, status = %run.status, "Rejected update to finished run");
            return Err(StoreError::Terminal {
                run_id: run_id.clone(),
                status: run.status,
            });
        }

        patch.apply(run);
        let updated = run.clone();
        inner.ttl.touch(run_id);

        trace!(run_id = %run_id, status = %updated.status, "Run updated");
        Ok(updated)
    }

    /// Append one entry to a run's step log.
    pub async fn append_message(&self, run_id: &RunId, message: AgentMessage) -> Result<Run> {
        self.update(run_id, RunPatch::new().with_message(message)).await
    }

    /// Recent runs, most recent first, capped at `limit` and at the
    /// configured recent-list size.
    pub async fn list_recent(&self, limit: usize) -> Vec<RunSummary> {
        let inner = self.inner.read().await;
        inner
            .recent
            .iter()
            .filter(|id| !inner.ttl.is_expired(id))
            .filter_map(|id| inner.runs.peek(id))
            .take(limit.min(self.config.recent_limit))
            .map(Run::summary)
            .collect()
    }

    /// Remove every expired run. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let expired = inner.ttl.drain_expired();
        for run_id in &expired {
            inner.runs.pop(run_id);
        }
        if !expired.is_empty() {
            let StoreInner { runs, recent, .. } = &mut *inner;
            recent.retain(|id| runs.contains(id));
            debug!(count = expired.len(), "Cleaned up expired runs");
        }
        expired.len()
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) on the configured
    /// interval until the returned task is aborted.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let store = self.clone();
        let interval = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.cleanup_expired().await;
            }
        })
    }
}
