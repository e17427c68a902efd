use std::sync::Arc;
use std::time::Duration;

use archadvisor_events::EventBus;
use archadvisor_pipeline::testing::{
    self, REQUIREMENTS, ScriptedHandler, StaticRetriever, critical_review, failing_design,
    passing_design, proceed_review,
};
use archadvisor_pipeline::{Orchestrator, PipelineError, Step, StepHandlers, StepOutput};
use archadvisor_store::RunStore;
use archadvisor_types::{
    Agent, EventKind, Preferences, Review, ReviewFinding, ReviewRecommendation, Route, RunEvent,
    RunId, RunRequest, RunStatus, Severity,
};
use archadvisor_validate::ValidationEngine;

fn orchestrator(handlers: StepHandlers) -> Orchestrator {
    Orchestrator::new(
        RunStore::default(),
        EventBus::default(),
        Arc::new(ValidationEngine::new()),
        handlers,
    )
}

fn architect_passing() -> Arc<ScriptedHandler> {
    Arc::new(ScriptedHandler::always(
        "architect",
        StepOutput::design(passing_design()).with_cost(0.05).with_model("architect-model"),
    ))
}

fn reviewer_proceeding() -> Arc<ScriptedHandler> {
    Arc::new(ScriptedHandler::always(
        "reviewer",
        StepOutput::review(proceed_review()).with_cost(0.03),
    ))
}

fn request() -> RunRequest {
    RunRequest::new(REQUIREMENTS)
}

fn history(orchestrator: &Orchestrator, run_id: &RunId) -> Vec<RunEvent> {
    orchestrator.bus().history(run_id)
}

fn messages_from(run: &archadvisor_types::Run, agent: Agent) -> usize {
    run.messages.iter().filter(|m| m.agent == agent).count()
}

#[tokio::test]
async fn test_happy_path_completes() {
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer_proceeding()));
    let run = orchestrator.submit(request()).await.unwrap();
    assert_eq!(run.status, RunStatus::Initializing);

    let done = orchestrator.wait(&run.id).await.unwrap();
    assert_eq!(done.status, RunStatus::Complete);
    assert_eq!(done.messages.len(), 6);
    assert_eq!(done.validation_round, 0);
    assert_eq!(done.debate_round, 0);
    assert!(!done.validation_incomplete);
    assert!(!done.debate_unresolved);
    assert!((done.total_cost_usd - 0.11).abs() < 1e-9);
    assert_eq!(done.validation_report.as_ref().map(|r| r.score), Some(100));
    assert!(done.completed_at.is_some());
    assert_eq!(done.models_used(), vec!["architect-model".to_string()]);

    let events = history(&orchestrator, &run.id);
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=events.len() as u64).collect::<Vec<_>>());
    assert!(matches!(
        events.first().map(|e| &e.kind),
        Some(EventKind::WorkflowProgress { status: RunStatus::Initializing, .. })
    ));
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::RunComplete { validation_incomplete: false, debate_unresolved: false, .. })
    ));

    let output = orchestrator.output(&run.id).await.unwrap();
    assert_eq!(output.markdown, "# Order platform\n");
    assert_eq!(output.diagrams.len(), 1);
    assert_eq!(output.metadata.validation_score, Some(100));
}

#[tokio::test]
async fn test_validation_loop_forces_ahead_after_two_rounds() {
    let architect = Arc::new(ScriptedHandler::always(
        "architect",
        StepOutput::design(failing_design()),
    ));
    let reviewer = reviewer_proceeding();
    let orchestrator = orchestrator(testing::handlers(architect.clone(), reviewer.clone()));

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(done.status, RunStatus::Complete);
    assert_eq!(
        architect.steps(),
        vec![Step::Design, Step::ReviseFromValidation, Step::ReviseFromValidation]
    );
    assert_eq!(done.validation_round, 2);
    assert!(done.validation_incomplete);
    assert_eq!(messages_from(&done, Agent::Validator), 3);
    assert_eq!(reviewer.calls(), 1);

    let report = done.validation_report.expect("report");
    assert!(!report.passed);
    assert!(report.verdict.contains("persist from the previous revision"));
}

#[tokio::test]
async fn test_validation_recovers_after_one_revision() {
    let architect = Arc::new(
        ScriptedHandler::new("architect")
            .then(StepOutput::design(failing_design()))
            .repeating(StepOutput::design(passing_design())),
    );
    let orchestrator = orchestrator(testing::handlers(architect.clone(), reviewer_proceeding()));

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(architect.calls(), 2);
    assert_eq!(done.validation_round, 1);
    assert!(!done.validation_incomplete);
    assert!(done.validation_report.unwrap().passed);
}

#[tokio::test]
async fn test_debate_bound_of_one_forces_cost_analysis() {
    let architect = architect_passing();
    let reviewer = Arc::new(ScriptedHandler::always(
        "reviewer",
        StepOutput::review(critical_review()),
    ));
    let orchestrator = orchestrator(testing::handlers(architect.clone(), reviewer.clone()));

    let request = request().with_preferences(Preferences::default().with_max_debate_rounds(1));
    let run = orchestrator.submit(request).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(done.status, RunStatus::Complete);
    assert_eq!(architect.steps(), vec![Step::Design, Step::ReviseFromReview]);
    assert_eq!(reviewer.calls(), 2);
    assert_eq!(done.debate_round, 1);
    assert!(done.debate_unresolved);
    assert_eq!(messages_from(&done, Agent::CostAnalyzer), 1);

    let actions: Vec<Route> = history(&orchestrator, &run.id)
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::DebateRoundCompleted { next_action, .. } => Some(next_action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec![Route::Revise, Route::ForceProceed]);

    let rounds: Vec<(u32, u32)> = history(&orchestrator, &run.id)
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::DebateRoundStarted { round, max_rounds } => Some((round, max_rounds)),
            _ => None,
        })
        .collect();
    assert_eq!(rounds, vec![(1, 1), (2, 1)]);
}

#[tokio::test]
async fn test_review_findings_are_capped() {
    let mut review = Review::new(ReviewRecommendation::Proceed);
    for n in 0..7 {
        review = review.with_finding(ReviewFinding::new(Severity::Low, "style", format!("nit {n}")));
    }
    review = review.with_finding(ReviewFinding::new(Severity::High, "resilience", "No retries"));
    let reviewer = Arc::new(ScriptedHandler::always("reviewer", StepOutput::review(review)));
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer));

    let run = orchestrator.submit(request()).await.unwrap();
    orchestrator.wait(&run.id).await.unwrap();

    let findings: Vec<Severity> = history(&orchestrator, &run.id)
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::FindingDiscovered {
                agent: Agent::DevilsAdvocate,
                severity,
                ..
            } => Some(severity),
            _ => None,
        })
        .collect();
    assert_eq!(findings.len(), 5);
    assert_eq!(findings[0], Severity::High);
}

#[tokio::test]
async fn test_step_failure_ends_run_in_error() {
    let architect = Arc::new(ScriptedHandler::new("architect").then_fail("provider unavailable"));
    let reviewer = reviewer_proceeding();
    let orchestrator = orchestrator(testing::handlers(architect, reviewer.clone()));

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(done.status, RunStatus::Error);
    assert_eq!(done.errors.len(), 1);
    assert_eq!(done.errors[0].step, "design");
    assert!(done.errors[0].message.contains("provider unavailable"));
    assert_eq!(reviewer.calls(), 0);
    assert!(matches!(
        history(&orchestrator, &run.id).last().map(|e| &e.kind),
        Some(EventKind::Error { recoverable: false, .. })
    ));
}

#[tokio::test]
async fn test_wrong_product_is_a_step_failure() {
    let architect = Arc::new(ScriptedHandler::always(
        "architect",
        StepOutput::review(proceed_review()),
    ));
    let orchestrator = orchestrator(testing::handlers(architect, reviewer_proceeding()));

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();
    assert_eq!(done.status, RunStatus::Error);
    assert!(done.errors[0].message.contains("expected design"));
}

#[tokio::test]
async fn test_context_failure_degrades_to_empty() {
    let handlers = testing::handlers(architect_passing(), reviewer_proceeding())
        .with_context(Arc::new(StaticRetriever::failing()));
    let orchestrator = orchestrator(handlers);

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();
    assert_eq!(done.status, RunStatus::Complete);
    assert!(done.similar_architectures.is_empty());
}

#[tokio::test]
async fn test_context_is_recorded() {
    let handlers = testing::handlers(architect_passing(), reviewer_proceeding()).with_context(
        Arc::new(StaticRetriever::new(vec!["retail-orders-2023".to_string()])),
    );
    let orchestrator = orchestrator(handlers);

    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();
    assert_eq!(done.similar_architectures, vec!["retail-orders-2023".to_string()]);
}

#[tokio::test]
async fn test_cancel_mid_step_discards_result_and_stops() {
    let architect = Arc::new(
        ScriptedHandler::always("architect", StepOutput::design(passing_design()))
            .with_delay(Duration::from_millis(300)),
    );
    let reviewer = reviewer_proceeding();
    let orchestrator = orchestrator(testing::handlers(architect.clone(), reviewer.clone()));

    let run = orchestrator.submit(request()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(orchestrator.status(&run.id).await.unwrap().status, RunStatus::Designing);

    assert_eq!(orchestrator.cancel(&run.id).await.unwrap(), RunStatus::Cancelled);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let after = orchestrator.status(&run.id).await.unwrap();
    assert_eq!(after.status, RunStatus::Cancelled);
    assert!(after.errors.is_empty());
    assert!(after.current_design.is_none());
    assert_eq!(messages_from(&after, Agent::Architect), 0);
    assert_eq!(architect.calls(), 1);
    assert_eq!(reviewer.calls(), 0);

    let events = history(&orchestrator, &run.id);
    assert!(events.iter().any(|e| matches!(e.kind, EventKind::RunCancelled { .. })));
    assert!(!events.iter().any(|e| matches!(
        e.kind,
        EventKind::AgentCompleted { agent: Agent::Architect, .. }
    )));
}

#[tokio::test]
async fn test_step_events_stop_after_terminal_event() {
    let architect = Arc::new(
        ScriptedHandler::always("architect", StepOutput::design(passing_design()))
            .with_delay(Duration::from_millis(200)),
    );
    let reviewer = Arc::new(
        ScriptedHandler::always("reviewer", StepOutput::review(proceed_review()))
            .with_delay(Duration::from_millis(400)),
    );
    let orchestrator = orchestrator(testing::handlers(architect.clone(), reviewer.clone()));

    let run = orchestrator.submit(request()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // The stream ends while the design write is still ahead.
    orchestrator.bus().publish(
        &run.id,
        EventKind::RunCancelled {
            message: "Run cancelled by request".to_string(),
        },
    );
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(orchestrator.cancel(&run.id).await.unwrap(), RunStatus::Cancelled);
    tokio::time::sleep(Duration::from_millis(450)).await;

    let after = orchestrator.status(&run.id).await.unwrap();
    assert_eq!(after.status, RunStatus::Cancelled);
    assert_eq!(messages_from(&after, Agent::Architect), 1);
    assert_eq!(messages_from(&after, Agent::Validator), 1);

    let events = history(&orchestrator, &run.id);
    let first_terminal = events
        .iter()
        .position(|e| e.kind.is_terminal())
        .unwrap();
    assert!(events[first_terminal + 1..]
        .iter()
        .all(|e| matches!(e.kind, EventKind::RunCancelled { .. })));
    assert!(!events.iter().any(|e| matches!(
        e.kind,
        EventKind::AgentCompleted { agent: Agent::Architect, .. }
    )));
}

#[tokio::test]
async fn test_cancel_on_complete_run_is_noop() {
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer_proceeding()));
    let run = orchestrator.submit(request()).await.unwrap();
    let done = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(orchestrator.cancel(&run.id).await.unwrap(), RunStatus::Complete);
    assert_eq!(orchestrator.cancel(&run.id).await.unwrap(), RunStatus::Complete);
    let after = orchestrator.status(&run.id).await.unwrap();
    assert_eq!(after.status, RunStatus::Complete);
    assert_eq!(after.completed_at, done.completed_at);
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer_proceeding()));
    let missing = RunId::from("arch_00000000");
    assert!(matches!(
        orchestrator.cancel(&missing).await,
        Err(PipelineError::NotFound(_))
    ));
    assert!(matches!(
        orchestrator.output(&missing).await,
        Err(PipelineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_request_creates_nothing() {
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer_proceeding()));
    let err = orchestrator.submit(RunRequest::new("too short")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Input(_)));

    let rounds = request().with_preferences(Preferences::default().with_max_debate_rounds(9));
    assert!(orchestrator.submit(rounds).await.is_err());
    assert!(orchestrator.store().is_empty().await);
}

#[tokio::test]
async fn test_output_not_ready_while_running() {
    let architect = Arc::new(
        ScriptedHandler::always("architect", StepOutput::design(passing_design()))
            .with_delay(Duration::from_millis(200)),
    );
    let orchestrator = orchestrator(testing::handlers(architect, reviewer_proceeding()));
    let run = orchestrator.submit(request()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        orchestrator.output(&run.id).await,
        Err(PipelineError::NotReady { .. })
    ));

    orchestrator.wait(&run.id).await.unwrap();
    assert!(orchestrator.output(&run.id).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_are_independent() {
    let orchestrator = orchestrator(testing::handlers(architect_passing(), reviewer_proceeding()));

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(orchestrator.submit(request()).await.unwrap().id);
    }
    for id in &ids {
        let done = orchestrator.wait(id).await.unwrap();
        assert_eq!(done.status, RunStatus::Complete);
        assert_eq!(done.messages.len(), 6);
        let events = history(&orchestrator, id);
        assert_eq!(events.first().map(|e| e.seq), Some(1));
        assert!(events.iter().all(|e| &e.run_id == id));
    }
    assert_eq!(orchestrator.list_recent(10).await.len(), 5);
}
