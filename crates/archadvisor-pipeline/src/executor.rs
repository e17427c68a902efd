//! Drives one run through the step graph.

use std::sync::Arc;
use std::time::Instant;

use archadvisor_events::EventBus;
use archadvisor_store::{RunStore, StoreError};
use archadvisor_types::{
    Agent, AgentMessage, ErrorRecord, EventKind, Review, Route, Run, RunId, RunPatch, RunStatus,
    now,
};
use archadvisor_validate::ValidationEngine;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StepError};
use crate::handler::{StepContext, StepHandlers, StepProduct};
use crate::step::{Step, route_after_review, route_after_validation};

/// Validation findings announced per pass, most severe first.
pub const MAX_VALIDATION_FINDING_EVENTS: usize = 8;

/// Review findings announced per round, most severe first.
pub const MAX_REVIEW_FINDING_EVENTS: usize = 5;

/// What a step contributes once it succeeds. The executor adds the message
/// to the patch, persists it, then publishes `events` and `agent_completed`.
struct StepResult {
    patch: RunPatch,
    message: AgentMessage,
    events: Vec<EventKind>,
    next: Option<Step>,
}

enum Persisted {
    Saved(Run),
    /// The run went terminal underneath us (cancelled).
    Stopped(RunStatus),
}

/// Runs steps strictly in sequence for one run at a time; share it across
/// runs freely.
pub struct Executor {
    store: RunStore,
    bus: EventBus,
    engine: Arc<ValidationEngine>,
    handlers: StepHandlers,
}

impl Executor {
    pub fn new(
        store: RunStore,
        bus: EventBus,
        engine: Arc<ValidationEngine>,
        handlers: StepHandlers,
    ) -> Self {
        Self {
            store,
            bus,
            engine,
            handlers,
        }
    }

    /// Execute a stored run to a terminal status and return that status.
    ///
    /// Step failures end the run in `error` and are not errors here; only a
    /// run vanishing from the store is.
    pub async fn run(&self, run_id: &RunId) -> Result<RunStatus> {
        let started = Instant::now();
        info!(run_id = %run_id, "Run started");

        let result = self.drive(run_id).await;
        match &result {
            Ok(status) => info!(
                run_id = %run_id,
                status = %status,
                duration_ms = started.elapsed().as_millis() as u64,
                "Run finished"
            ),
            Err(e) => error!(run_id = %run_id, error = %e, "Run aborted"),
        }
        self.bus.retire(run_id);
        result
    }

    async fn drive(&self, run_id: &RunId) -> Result<RunStatus> {
        let mut step = Step::RetrieveContext;
        loop {
            // The status write doubles as the cancellation check at the
            // step boundary.
            let run = match self
                .persist(run_id, RunPatch::new().with_status(step.status()))
                .await?
            {
                Persisted::Saved(run) => run,
                Persisted::Stopped(status) => return Ok(stopped(run_id, step, status)),
            };

            // A cancel can land between a write and its events, so step
            // events only go out while the stream is still open.
            self.bus
                .publish_open(run_id, EventKind::progress(step.status(), step.progress_message()));
            self.bus
                .publish_open(run_id, EventKind::started(step.agent(), step.progress_message()));
            debug!(run_id = %run_id, step = %step, "Step started");

            let outcome = match step {
                Step::RetrieveContext => Ok(self.retrieve_context(&run).await),
                Step::Validate => Ok(self.validate(&run)),
                _ => self.invoke(step, &run).await,
            };

            let result = match outcome {
                Ok(result) => result,
                Err(err) => return self.fail(run_id, step, err).await,
            };

            let message = result.message.clone();
            match self
                .persist(run_id, result.patch.with_message(result.message))
                .await?
            {
                Persisted::Saved(_) => {}
                Persisted::Stopped(status) => return Ok(stopped(run_id, step, status)),
            }

            for event in result.events {
                self.bus.publish_open(run_id, event);
            }
            self.bus.publish_open(
                run_id,
                EventKind::AgentCompleted {
                    agent: message.agent,
                    summary: message.summary,
                    duration_seconds: message.duration_seconds,
                    cost_usd: message.cost_usd,
                },
            );
            debug!(run_id = %run_id, step = %step, "Step completed");

            match result.next {
                Some(next) => step = next,
                None => return self.complete(run_id).await,
            }
        }
    }

    async fn persist(&self, run_id: &RunId, patch: RunPatch) -> Result<Persisted> {
        match self.store.update(run_id, patch).await {
            Ok(run) => Ok(Persisted::Saved(run)),
            Err(StoreError::Terminal { status, .. }) => Ok(Persisted::Stopped(status)),
            Err(e) => Err(e.into()),
        }
    }

    async fn retrieve_context(&self, run: &Run) -> StepResult {
        let started = Instant::now();
        let similar = match self
            .handlers
            .context
            .similar_architectures(&run.requirements)
            .await
        {
            Ok(similar) => similar,
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "Context retrieval failed, continuing without");
                Vec::new()
            }
        };

        let message = AgentMessage::new(
            Agent::ContextRetriever,
            format!("Found {} similar architecture(s)", similar.len()),
        )
        .with_duration(started.elapsed().as_secs_f64());

        StepResult {
            patch: RunPatch::new().with_similar_architectures(similar),
            message,
            events: Vec::new(),
            next: Step::RetrieveContext.next(),
        }
    }

    fn validate(&self, run: &Run) -> StepResult {
        let started = Instant::now();
        let design = run.current_design.clone().unwrap_or(Value::Null);
        let report =
            self.engine
                .run_with_previous(&design, &run.requirements, run.validation_report.as_ref());
        let route = route_after_validation(report.passed, run.validation_round);

        let events = report
            .findings
            .iter()
            .take(MAX_VALIDATION_FINDING_EVENTS)
            .map(|f| EventKind::FindingDiscovered {
                agent: Agent::Validator,
                severity: f.severity,
                category: f.code.as_str().to_string(),
                component: f.component.clone(),
                summary: f.message.clone(),
            })
            .collect();

        let summary = format!(
            "Score: {}/100 | {} critical, {} high, {} medium | {}",
            report.score,
            report.summary.critical,
            report.summary.high,
            report.summary.medium,
            if report.passed { "PASS" } else { "FAIL" }
        );
        let message = AgentMessage::new(Agent::Validator, summary)
            .with_duration(started.elapsed().as_secs_f64());

        let mut patch = RunPatch::new().with_validation_report(report);
        match route {
            Route::Revise => patch = patch.with_validation_round(run.validation_round + 1),
            Route::ForceProceed => patch = patch.with_validation_incomplete(true),
            Route::Proceed => {}
        }

        StepResult {
            patch,
            message,
            events,
            next: Step::Validate.after(route),
        }
    }

    async fn invoke(&self, step: Step, run: &Run) -> std::result::Result<StepResult, StepError> {
        let Some(handler) = self.handlers.for_step(step) else {
            return Err(StepError::failed(step, "no handler registered"));
        };

        if step == Step::Review {
            self.bus.publish_open(
                &run.id,
                EventKind::DebateRoundStarted {
                    round: run.debate_round + 1,
                    max_rounds: run.preferences.max_debate_rounds,
                },
            );
        }

        let ctx = StepContext {
            step,
            run: run.clone(),
            events: self.bus.publisher(run.id.clone()),
        };
        let started = Instant::now();
        let output = handler.execute(ctx).await?;

        let duration = output
            .duration_seconds
            .unwrap_or_else(|| started.elapsed().as_secs_f64());
        let mut message = AgentMessage::new(step.agent(), output.summary)
            .with_duration(duration)
            .with_cost(output.cost_usd);
        if let Some(model) = output.model {
            message = message.with_model(model);
        }

        match (step, output.product) {
            (step, StepProduct::Design(design)) if step.is_design() => Ok(StepResult {
                patch: RunPatch::new().with_design(design),
                message,
                events: Vec::new(),
                next: step.next(),
            }),
            (Step::Review, StepProduct::Review(review)) => Ok(review_result(run, review, message)),
            (Step::Cost, StepProduct::CostAnalysis(analysis)) => Ok(StepResult {
                patch: RunPatch::new().with_cost_analysis(analysis),
                message,
                events: Vec::new(),
                next: Step::Cost.next(),
            }),
            (Step::Document, StepProduct::Document { markdown, diagrams }) => Ok(StepResult {
                patch: RunPatch::new().with_document(markdown, diagrams),
                message,
                events: Vec::new(),
                next: None,
            }),
            (step, product) => {
                debug!(run_id = %run.id, step = %step, got = product.kind(), "Handler returned wrong product");
                Err(StepError::UnexpectedOutput {
                    step,
                    expected: expected_product(step),
                })
            }
        }
    }

    async fn fail(&self, run_id: &RunId, step: Step, err: StepError) -> Result<RunStatus> {
        error!(run_id = %run_id, step = %step, error = %err, "Step failed");
        let patch = RunPatch::new()
            .with_error(ErrorRecord::new(step.as_str(), err.to_string()))
            .with_status(RunStatus::Error)
            .with_completed_at(now());
        if let Persisted::Stopped(status) = self.persist(run_id, patch).await? {
            return Ok(stopped(run_id, step, status));
        }

        self.bus.publish(
            run_id,
            EventKind::Error {
                message: format!("Workflow failed: {err}"),
                recoverable: false,
            },
        );
        Ok(RunStatus::Error)
    }

    async fn complete(&self, run_id: &RunId) -> Result<RunStatus> {
        let patch = RunPatch::new()
            .with_status(RunStatus::Complete)
            .with_completed_at(now());
        let run = match self.persist(run_id, patch).await? {
            Persisted::Saved(run) => run,
            Persisted::Stopped(status) => return Ok(stopped(run_id, Step::Document, status)),
        };

        self.bus.publish(
            run_id,
            EventKind::progress(RunStatus::Complete, "Architecture document ready"),
        );
        self.bus.publish(
            run_id,
            EventKind::RunComplete {
                duration_seconds: run.duration_seconds(),
                total_cost_usd: run.total_cost_usd,
                debate_rounds: run.debate_round,
                validation_rounds: run.validation_round,
                validation_incomplete: run.validation_incomplete,
                debate_unresolved: run.debate_unresolved,
                output_url: format!("/api/v1/runs/{run_id}/output"),
            },
        );
        info!(
            run_id = %run_id,
            debate_rounds = run.debate_round,
            validation_rounds = run.validation_round,
            total_cost_usd = run.total_cost_usd,
            "Run complete"
        );
        Ok(RunStatus::Complete)
    }
}

fn review_result(run: &Run, review: Review, message: AgentMessage) -> StepResult {
    let route = route_after_review(
        review.recommendation,
        run.debate_round,
        run.preferences.max_debate_rounds,
    );

    let mut events: Vec<EventKind> = review
        .ranked_findings()
        .into_iter()
        .take(MAX_REVIEW_FINDING_EVENTS)
        .map(|f| EventKind::FindingDiscovered {
            agent: Agent::DevilsAdvocate,
            severity: f.severity,
            category: f.category.clone(),
            component: f.component.clone(),
            summary: f.issue.clone(),
        })
        .collect();
    events.push(EventKind::DebateRoundCompleted {
        round: run.debate_round + 1,
        findings_total: review.findings.len(),
        findings_critical: review.critical_count(),
        next_action: route,
    });

    let mut patch = RunPatch::new().with_review(review);
    match route {
        Route::Revise => patch = patch.with_debate_round(run.debate_round + 1),
        Route::ForceProceed => patch = patch.with_debate_unresolved(true),
        Route::Proceed => {}
    }

    StepResult {
        patch,
        message,
        events,
        next: Step::Review.after(route),
    }
}

fn expected_product(step: Step) -> &'static str {
    match step {
        Step::Review => "review",
        Step::Cost => "cost analysis",
        Step::Document => "document",
        _ => "design",
    }
}

fn stopped(run_id: &RunId, step: Step, status: RunStatus) -> RunStatus {
    info!(run_id = %run_id, step = %step, status = %status, "Run stopped at step boundary");
    status
}
