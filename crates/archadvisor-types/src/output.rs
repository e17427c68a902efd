//! What a finished run hands back.

use serde::{Deserialize, Serialize};

use crate::run::{Diagram, Run, RunId, RunStatus};

/// Bookkeeping attached to a run's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub duration_seconds: f64,
    pub total_cost_usd: f64,
    pub debate_rounds: u32,
    pub validation_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<u32>,
    pub models_used: Vec<String>,
    pub validation_incomplete: bool,
    pub debate_unresolved: bool,
}

/// Rendered document and diagrams of a terminal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Empty when the run stopped before the document step.
    pub markdown: String,
    pub diagrams: Vec<Diagram>,
    pub metadata: OutputMetadata,
}

impl RunOutput {
    pub fn from_run(run: &Run) -> Self {
        Self {
            run_id: run.id.clone(),
            status: run.status,
            markdown: run.document.clone().unwrap_or_default(),
            diagrams: run.diagrams.clone(),
            metadata: OutputMetadata {
                duration_seconds: run.duration_seconds(),
                total_cost_usd: run.total_cost_usd,
                debate_rounds: run.debate_round,
                validation_rounds: run.validation_round,
                validation_score: run.validation_report.as_ref().map(|r| r.score),
                models_used: run.models_used(),
                validation_incomplete: run.validation_incomplete,
                debate_unresolved: run.debate_unresolved,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{RunPatch, RunRequest};

    #[test]
    fn test_output_carries_exhaustion_flags() {
        let mut run = Run::new(
            RunId::from("arch_0000abcd"),
            RunRequest::new("Design a data pipeline that ingests clickstream events for reporting."),
        );
        RunPatch::new()
            .with_status(RunStatus::Complete)
            .with_document("# Doc", vec![])
            .with_validation_round(2)
            .with_validation_incomplete(true)
            .apply(&mut run);

        let output = RunOutput::from_run(&run);
        assert_eq!(output.markdown, "# Doc");
        assert_eq!(output.metadata.validation_rounds, 2);
        assert!(output.metadata.validation_incomplete);
        assert!(!output.metadata.debate_unresolved);
        assert!(output.metadata.validation_score.is_none());
    }
}
