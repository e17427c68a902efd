//! Wire formats and request checks as transports see them.

use archadvisor_types::{
    Agent, AgentMessage, CloudProvider, ErrorRecord, EventKind, InputError, Preferences, Run,
    RunId, RunOutput, RunPatch, RunRequest, RunStatus, RunSummary, TOTAL_STEPS,
};
use serde_json::{Value, json};

fn requirements(chars: usize) -> String {
    "r".repeat(chars)
}

#[test]
fn test_request_length_bounds_are_inclusive() {
    assert!(RunRequest::new(requirements(50)).validate().is_ok());
    assert!(RunRequest::new(requirements(10_000)).validate().is_ok());

    let err = RunRequest::new(requirements(49)).validate().unwrap_err();
    assert_eq!(
        err,
        InputError::RequirementsLength {
            len: 49,
            min: 50,
            max: 10_000
        }
    );
    assert!(RunRequest::new(requirements(10_001)).validate().is_err());
}

#[test]
fn test_request_length_ignores_surrounding_whitespace() {
    let padded = format!("   \n{}\n   ", requirements(49));
    assert!(RunRequest::new(padded).validate().is_err());

    // Multi-byte characters count once each.
    assert!(RunRequest::new("é".repeat(50)).validate().is_ok());
}

#[test]
fn test_debate_round_bounds() {
    for rounds in [1, 5] {
        let request = RunRequest::new(requirements(60))
            .with_preferences(Preferences::default().with_max_debate_rounds(rounds));
        assert!(request.validate().is_ok(), "{rounds}");
    }
    for rounds in [0, 6] {
        let request = RunRequest::new(requirements(60))
            .with_preferences(Preferences::default().with_max_debate_rounds(rounds));
        assert!(
            matches!(request.validate(), Err(InputError::DebateRounds { .. })),
            "{rounds}"
        );
    }
}

#[test]
fn test_partial_preferences_fill_defaults() {
    let request: RunRequest = serde_json::from_value(json!({
        "requirements": requirements(60),
        "preferences": {"cloud_provider": "gcp"}
    }))
    .unwrap();
    assert_eq!(request.preferences.cloud_provider, CloudProvider::Gcp);
    assert_eq!(request.preferences.max_debate_rounds, 3);

    let request: RunRequest =
        serde_json::from_value(json!({"requirements": requirements(60)})).unwrap();
    assert_eq!(request.preferences, Preferences::default());
}

#[test]
fn test_run_id_format() {
    let id = RunId::generate();
    let hex = id.as_str().strip_prefix("arch_").unwrap();
    assert_eq!(hex.len(), 8);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(serde_json::to_value(&id).unwrap(), Value::String(id.to_string()));
    assert_ne!(RunId::generate(), RunId::generate());
}

#[test]
fn test_status_wire_names_and_progress() {
    assert_eq!(
        serde_json::to_value(RunStatus::RetrievingContext).unwrap(),
        "retrieving_context"
    );
    assert_eq!(RunStatus::Complete.steps_completed(), TOTAL_STEPS);
    assert_eq!(RunStatus::Cancelled.steps_completed(), -1);
    assert_eq!(RunStatus::Revising.current_agent(), Some(Agent::Architect));
    assert_eq!(RunStatus::Complete.current_agent(), None);
}

#[test]
fn test_patches_from_one_snapshot_both_land() {
    let mut run = Run::new(RunId::generate(), RunRequest::new(requirements(60)));

    let a = RunPatch::new()
        .with_message(AgentMessage::new(Agent::Architect, "design").with_cost(0.05));
    let b = RunPatch::new()
        .with_status(RunStatus::Error)
        .with_error(ErrorRecord::new("review", "timed out"));
    a.apply(&mut run);
    b.apply(&mut run);

    assert_eq!(run.messages.len(), 1);
    assert_eq!(run.errors.len(), 1);
    assert!((run.total_cost_usd - 0.05).abs() < 1e-9);
    assert_eq!(run.status, RunStatus::Error);
    assert!(RunPatch::new().is_empty());
}

#[test]
fn test_summary_preview_is_truncated() {
    let run = Run::new(RunId::generate(), RunRequest::new(requirements(150)));
    let summary: RunSummary = run.summary();
    assert_eq!(
        summary.requirements_preview.chars().count(),
        RunSummary::PREVIEW_CHARS + 3
    );
    assert!(summary.requirements_preview.ends_with("..."));
}

#[test]
fn test_event_kind_tags() {
    let kind = EventKind::thinking(Agent::DevilsAdvocate, "poking holes");
    let value = serde_json::to_value(&kind).unwrap();
    assert_eq!(value["type"], "agent_thinking");
    assert_eq!(value["agent"], "devils_advocate");
    assert!(!kind.is_terminal());
    assert!(
        EventKind::RunCancelled {
            message: "stopped".into()
        }
        .is_terminal()
    );
}

#[test]
fn test_output_of_unfinished_run_has_empty_document() {
    let run = Run::new(RunId::generate(), RunRequest::new(requirements(60)));
    let output = RunOutput::from_run(&run);
    assert!(output.markdown.is_empty());
    assert!(output.diagrams.is_empty());
    assert_eq!(output.metadata.validation_score, None);
}
