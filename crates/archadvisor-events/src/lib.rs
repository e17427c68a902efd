//! Run-scoped event bus.
//!
//! Observers of a run subscribe by run id and receive the retained history
//! (the last [`DEFAULT_HISTORY_LIMIT`] events by default) followed by every
//! later event in publication order. Publishing never waits on observers: a
//! listener whose queue fills up, or whose receiver is gone, is detached.
//!
//! ```rust,ignore
//! use archadvisor_events::{EventBus, EventBusConfig};
//!
//! let bus = EventBus::new(EventBusConfig::default());
//! let mut sub = bus.subscribe(&run_id);
//! for event in sub.history.drain(..) { /* replay */ }
//! while let Some(event) = sub.recv().await { /* live */ }
//! ```

mod bus;
mod config;

pub use bus::{EventBus, Publisher, Subscription};
pub use config::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_RETIRE_GRACE, DEFAULT_SUBSCRIBER_BUFFER, EventBusConfig,
};
