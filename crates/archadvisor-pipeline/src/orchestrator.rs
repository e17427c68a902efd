//! The service object the transport layer talks to.

use std::sync::Arc;

use archadvisor_events::{EventBus, Subscription};
use archadvisor_store::{RunStore, StoreError};
use archadvisor_types::{
    EventKind, Run, RunId, RunOutput, RunPatch, RunRequest, RunStatus, RunSummary, now,
};
use archadvisor_validate::ValidationEngine;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{PipelineError, Result};
use crate::executor::Executor;
use crate::handler::StepHandlers;

/// Fresh ids tried before giving up on a collision streak.
const ID_ATTEMPTS: usize = 3;

/// Accepts runs, executes each on its own task, and answers queries.
///
/// Cheap to clone; clones share the store, bus and executor.
#[derive(Clone)]
pub struct Orchestrator {
    store: RunStore,
    bus: EventBus,
    engine: Arc<ValidationEngine>,
    executor: Arc<Executor>,
}

impl Orchestrator {
    pub fn new(
        store: RunStore,
        bus: EventBus,
        engine: Arc<ValidationEngine>,
        handlers: StepHandlers,
    ) -> Self {
        let executor = Executor::new(store.clone(), bus.clone(), Arc::clone(&engine), handlers);
        Self {
            store,
            bus,
            engine,
            executor: Arc::new(executor),
        }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Validate and store a run, then start it in the background.
    pub async fn submit(&self, request: RunRequest) -> Result<Run> {
        self.submit_as(request, None).await
    }

    /// Like [`submit`](Self::submit), recording who submitted the run.
    pub async fn submit_as(&self, request: RunRequest, submitter: Option<String>) -> Result<Run> {
        request.validate()?;

        let mut attempt = 0;
        let run = loop {
            let mut run = Run::new(RunId::generate(), request.clone());
            if let Some(submitter) = &submitter {
                run = run.with_submitter(submitter.clone());
            }
            match self.store.create(run.clone()).await {
                Ok(()) => break run,
                Err(StoreError::AlreadyExists(id)) if attempt + 1 < ID_ATTEMPTS => {
                    debug!(run_id = %id, "Run id collision, generating another");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            run_id = %run.id,
            requirements_len = run.requirements.chars().count(),
            max_debate_rounds = run.preferences.max_debate_rounds,
            "Run submitted"
        );
        self.bus
            .publish(&run.id, EventKind::progress(RunStatus::Initializing, "Run accepted"));

        let executor = Arc::clone(&self.executor);
        let run_id = run.id.clone();
        let span = info_span!("run", run_id = %run_id);
        tokio::spawn(
            async move {
                // The executor logs its own outcome.
                let _ = executor.run(&run_id).await;
            }
            .instrument(span),
        );

        Ok(run)
    }

    /// Current snapshot of a run.
    pub async fn status(&self, run_id: &RunId) -> Result<Run> {
        Ok(self.store.get(run_id).await?)
    }

    /// Output of a terminal run.
    pub async fn output(&self, run_id: &RunId) -> Result<RunOutput> {
        let run = self.store.get(run_id).await?;
        if !run.is_terminal() {
            return Err(PipelineError::NotReady {
                run_id: run.id,
                status: run.status,
            });
        }
        Ok(RunOutput::from_run(&run))
    }

    /// Request cancellation. Returns the run's status afterwards; a run that
    /// already finished keeps its status.
    ///
    /// An in-flight step is not interrupted; the executor stops at the next
    /// step boundary and discards that step's result.
    pub async fn cancel(&self, run_id: &RunId) -> Result<RunStatus> {
        let run = self.store.get(run_id).await?;
        if run.is_terminal() {
            debug!(run_id = %run_id, status = %run.status, "Cancel on finished run ignored");
            return Ok(run.status);
        }

        let patch = RunPatch::new()
            .with_status(RunStatus::Cancelled)
            .with_completed_at(now());
        match self.store.update(run_id, patch).await {
            Ok(_) => {
                info!(run_id = %run_id, from = %run.status, "Run cancelled");
                self.bus.publish(
                    run_id,
                    EventKind::RunCancelled {
                        message: "Run cancelled by request".to_string(),
                    },
                );
                self.bus.retire(run_id);
                Ok(RunStatus::Cancelled)
            }
            Err(StoreError::Terminal { status, .. }) => Ok(status),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_recent(&self, limit: usize) -> Vec<RunSummary> {
        self.store.list_recent(limit).await
    }

    /// Attach to a run's event stream.
    pub fn subscribe(&self, run_id: &RunId) -> Subscription {
        self.bus.subscribe(run_id)
    }

    /// Wait until a run is terminal and return its final snapshot.
    pub async fn wait(&self, run_id: &RunId) -> Result<Run> {
        let mut subscription = self.bus.subscribe(run_id);
        let run = self.store.get(run_id).await?;
        if run.is_terminal() || subscription.history.iter().any(|e| e.kind.is_terminal()) {
            return self.settled(run_id).await;
        }
        while let Some(event) = subscription.recv().await {
            if event.kind.is_terminal() {
                break;
            }
        }
        self.settled(run_id).await
    }

    /// The final snapshot once the executor has let go of the run.
    async fn settled(&self, run_id: &RunId) -> Result<Run> {
        let run = self.store.get(run_id).await?;
        if !run.is_terminal() {
            warn!(run_id = %run_id, status = %run.status, "Event stream ended before the run finished");
        }
        Ok(run)
    }
}
