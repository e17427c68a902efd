//! In-process publish/subscribe keyed by run.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use archadvisor_types::{EventKind, RunEvent, RunId, now};
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::EventBusConfig;

type ListenerId = u64;

/// Per-run state: replay buffer plus live listeners.
struct Channel {
    history: VecDeque<RunEvent>,
    listeners: Vec<(ListenerId, mpsc::Sender<RunEvent>)>,
    next_seq: u64,
    retired_at: Option<Instant>,
    /// A terminal event has been published.
    closed: bool,
}

impl Channel {
    fn new(history_limit: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_limit.min(128)),
            listeners: Vec::new(),
            next_seq: 1,
            retired_at: None,
            closed: false,
        }
    }

    /// Stamp, record and fan out one event.
    fn emit(&mut self, run_id: &RunId, kind: EventKind, limit: usize) -> RunEvent {
        let event = RunEvent {
            run_id: run_id.clone(),
            seq: self.next_seq,
            timestamp: now(),
            kind,
        };
        self.next_seq += 1;
        self.closed |= event.kind.is_terminal();

        self.history.push_back(event.clone());
        while self.history.len() > limit {
            self.history.pop_front();
        }

        self.listeners.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(run_id = %run_id, listener = id, "Detaching slow event listener");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(run_id = %run_id, listener = id, "Detaching closed event listener");
                false
            }
        });

        trace!(
            run_id = %run_id,
            seq = event.seq,
            kind = event.kind.name(),
            listeners = self.listeners.len(),
            "Published event"
        );
        event
    }
}

struct Inner {
    channels: HashMap<RunId, Channel>,
    next_listener: ListenerId,
}

/// Run-scoped event distribution with bounded replay.
///
/// Publishing never blocks: each listener owns a bounded queue, and a
/// listener whose queue is full or closed is detached on the spot.
/// Subscribing snapshots the history and registers the listener under the
/// same lock, so a subscriber sees every event exactly once from the start
/// of the retained window.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    config: EventBusConfig,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                channels: HashMap::new(),
                next_listener: 0,
            })),
            config,
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Stamp, record and fan out an event. Returns the stamped event.
    pub fn publish(&self, run_id: &RunId, kind: EventKind) -> RunEvent {
        let limit = self.config.history_limit;
        let mut inner = self.inner.lock();
        inner
            .channels
            .entry(run_id.clone())
            .or_insert_with(|| Channel::new(limit))
            .emit(run_id, kind, limit)
    }

    /// Publish unless the run's stream already ended with a terminal event
    /// (`run_complete`, `run_cancelled` or a fatal `error`). The check and
    /// the append happen under one lock, so nothing lands after the
    /// terminal event. Returns `None` when the event was dropped.
    pub fn publish_open(&self, run_id: &RunId, kind: EventKind) -> Option<RunEvent> {
        let limit = self.config.history_limit;
        let mut inner = self.inner.lock();
        let channel = inner
            .channels
            .entry(run_id.clone())
            .or_insert_with(|| Channel::new(limit));
        if channel.closed {
            debug!(run_id = %run_id, kind = kind.name(), "Dropping event after terminal event");
            return None;
        }
        Some(channel.emit(run_id, kind, limit))
    }

    /// Whether a terminal event has been published for the run.
    pub fn is_closed(&self, run_id: &RunId) -> bool {
        self.inner
            .lock()
            .channels
            .get(run_id)
            .is_some_and(|c| c.closed)
    }

    /// Attach a listener. The returned subscription carries the retained
    /// history followed by every later event.
    pub fn subscribe(&self, run_id: &RunId) -> Subscription {
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);
        let mut inner = self.inner.lock();
        let id = inner.next_listener;
        inner.next_listener += 1;

        let limit = self.config.history_limit;
        let channel = inner
            .channels
            .entry(run_id.clone())
            .or_insert_with(|| Channel::new(limit));
        let history: Vec<RunEvent> = channel.history.iter().cloned().collect();
        channel.listeners.push((id, tx));

        debug!(run_id = %run_id, listener = id, replay = history.len(), "Subscribed");
        Subscription {
            run_id: run_id.clone(),
            history,
            receiver: rx,
        }
    }

    /// Retained events for a run, oldest first.
    pub fn history(&self, run_id: &RunId) -> Vec<RunEvent> {
        self.inner
            .lock()
            .channels
            .get(run_id)
            .map(|c| c.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Live listeners for a run. Dead listeners are only noticed on publish.
    pub fn subscriber_count(&self, run_id: &RunId) -> usize {
        self.inner
            .lock()
            .channels
            .get(run_id)
            .map_or(0, |c| c.listeners.len())
    }

    /// Runs currently held by the bus.
    pub fn run_count(&self) -> usize {
        self.inner.lock().channels.len()
    }

    /// Mark a run finished. Its channel is dropped by [`sweep`](Self::sweep)
    /// once the retire grace has passed.
    pub fn retire(&self, run_id: &RunId) {
        if let Some(channel) = self.inner.lock().channels.get_mut(run_id) {
            channel.retired_at.get_or_insert_with(Instant::now);
        }
    }

    /// Drop retired channels past their grace period, and channels nobody
    /// published to or listens on. Dropping a channel ends its listeners'
    /// streams. Returns how many channels were dropped.
    pub fn sweep(&self) -> usize {
        let grace = self.config.retire_grace;
        let mut inner = self.inner.lock();
        let before = inner.channels.len();
        inner.channels.retain(|_, channel| {
            channel.listeners.retain(|(_, tx)| !tx.is_closed());
            let expired = channel
                .retired_at
                .is_some_and(|at| at.elapsed() >= grace);
            let abandoned = channel.history.is_empty() && channel.listeners.is_empty();
            !(expired || abandoned)
        });
        let dropped = before - inner.channels.len();
        if dropped > 0 {
            debug!(dropped, remaining = inner.channels.len(), "Swept event channels");
        }
        dropped
    }

    /// Sweep on an interval until the returned task is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                bus.sweep();
            }
        })
    }

    /// A handle that publishes to one run.
    pub fn publisher(&self, run_id: RunId) -> Publisher {
        Publisher {
            bus: self.clone(),
            run_id,
        }
    }
}

/// A live listener: replayed history plus a queue of later events.
pub struct Subscription {
    pub run_id: RunId,
    /// Events published before the subscription, oldest first.
    pub history: Vec<RunEvent>,
    receiver: mpsc::Receiver<RunEvent>,
}

impl Subscription {
    /// Next live event; `None` once the run's channel is dropped or this
    /// listener was detached.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.receiver.recv().await
    }

    /// History followed by live events as one stream.
    pub fn into_stream(self) -> impl Stream<Item = RunEvent> + Send + 'static {
        use futures::StreamExt;

        let live = futures::stream::unfold(self.receiver, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        futures::stream::iter(self.history).chain(live)
    }
}

/// Publishes to a single run. Handed to step handlers so they can report
/// progress without knowing the run id.
#[derive(Clone)]
pub struct Publisher {
    bus: EventBus,
    run_id: RunId,
}

impl Publisher {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Publish progress chatter. Dropped once the run's stream has ended.
    pub fn publish(&self, kind: EventKind) -> Option<RunEvent> {
        self.bus.publish_open(&self.run_id, kind)
    }
}
