//! Run store with LRU capacity and TTL expiry.
//!
//! Runs live in memory for a fixed lifetime after their last write (24 hours
//! by default) and are mutated only through typed
//! [`RunPatch`](archadvisor_types::RunPatch)es. A run that has expired is
//! indistinguishable from one that never existed: both read as
//! [`StoreError::NotFound`].
//!
//! ```rust,ignore
//! use archadvisor_store::{RunStore, StoreConfig};
//!
//! let store = RunStore::new(StoreConfig::default().with_max_runs(1000));
//! store.create(run).await?;
//! let run = store.update(&run_id, RunPatch::new().with_status(RunStatus::Designing)).await?;
//! ```

mod config;
mod error;
mod store;
mod ttl;

pub use config::{DEFAULT_MAX_RUNS, DEFAULT_RECENT_LIMIT, DEFAULT_TTL, StoreConfig};
pub use error::{Result, StoreError};
pub use store::RunStore;
pub use ttl::TtlTracker;
