//! Events published while a run executes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::run::{RunId, RunStatus, TOTAL_STEPS};
use crate::validation::Severity;
use crate::Timestamp;

/// The pipeline's workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agent {
    ContextRetriever,
    Architect,
    Validator,
    DevilsAdvocate,
    CostAnalyzer,
    Documentation,
}

impl Agent {
    pub fn as_str(self) -> &'static str {
        match self {
            Agent::ContextRetriever => "context_retriever",
            Agent::Architect => "architect",
            Agent::Validator => "validator",
            Agent::DevilsAdvocate => "devils_advocate",
            Agent::CostAnalyzer => "cost_analyzer",
            Agent::Documentation => "documentation",
        }
    }

    /// Display name for UIs.
    pub fn label(self) -> &'static str {
        match self {
            Agent::ContextRetriever => "Context Retriever",
            Agent::Architect => "Architect",
            Agent::Validator => "Validator",
            Agent::DevilsAdvocate => "Devil's Advocate",
            Agent::CostAnalyzer => "Cost Analyzer",
            Agent::Documentation => "Documentation",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a routing decision at a loop gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Gate satisfied; move on.
    Proceed,
    /// Loop back through revision.
    Revise,
    /// Gate not satisfied but the loop bound is spent; move on anyway.
    ForceProceed,
}

/// Kind-specific payload of a [`RunEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    AgentStarted {
        agent: Agent,
        label: String,
        message: String,
    },
    AgentThinking {
        agent: Agent,
        message: String,
    },
    AgentCompleted {
        agent: Agent,
        summary: String,
        duration_seconds: f64,
        cost_usd: f64,
    },
    FindingDiscovered {
        agent: Agent,
        severity: Severity,
        category: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component: Option<String>,
        summary: String,
    },
    DebateRoundStarted {
        round: u32,
        max_rounds: u32,
    },
    DebateRoundCompleted {
        round: u32,
        findings_total: usize,
        findings_critical: usize,
        next_action: Route,
    },
    WorkflowProgress {
        status: RunStatus,
        step: i32,
        total_steps: i32,
        message: String,
    },
    RunComplete {
        duration_seconds: f64,
        total_cost_usd: f64,
        debate_rounds: u32,
        validation_rounds: u32,
        validation_incomplete: bool,
        debate_unresolved: bool,
        output_url: String,
    },
    RunCancelled {
        message: String,
    },
    Error {
        message: String,
        recoverable: bool,
    },
}

impl EventKind {
    pub fn started(agent: Agent, message: impl Into<String>) -> Self {
        EventKind::AgentStarted {
            agent,
            label: agent.label().to_string(),
            message: message.into(),
        }
    }

    pub fn thinking(agent: Agent, message: impl Into<String>) -> Self {
        EventKind::AgentThinking {
            agent,
            message: message.into(),
        }
    }

    pub fn progress(status: RunStatus, message: impl Into<String>) -> Self {
        EventKind::WorkflowProgress {
            status,
            step: status.steps_completed(),
            total_steps: TOTAL_STEPS,
            message: message.into(),
        }
    }

    /// Wire name of the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AgentStarted { .. } => "agent_started",
            EventKind::AgentThinking { .. } => "agent_thinking",
            EventKind::AgentCompleted { .. } => "agent_completed",
            EventKind::FindingDiscovered { .. } => "finding_discovered",
            EventKind::DebateRoundStarted { .. } => "debate_round_started",
            EventKind::DebateRoundCompleted { .. } => "debate_round_completed",
            EventKind::WorkflowProgress { .. } => "workflow_progress",
            EventKind::RunComplete { .. } => "run_complete",
            EventKind::RunCancelled { .. } => "run_cancelled",
            EventKind::Error { .. } => "error",
        }
    }

    /// No further events follow one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::RunComplete { .. }
                | EventKind::RunCancelled { .. }
                | EventKind::Error {
                    recoverable: false,
                    ..
                }
        )
    }
}

/// An event as stored in history and delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    /// Per-run sequence number, starting at 1.
    pub seq: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}
