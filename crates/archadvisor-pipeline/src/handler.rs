//! Interfaces to the external reasoning steps.

use std::sync::Arc;

use archadvisor_events::Publisher;
use archadvisor_types::{Diagram, Review, Run};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::StepError;
use crate::step::Step;

/// What a step handler sees: the step being run, a snapshot of the run, and
/// a publisher for progress chatter (`agent_thinking` and the like).
#[derive(Clone)]
pub struct StepContext {
    pub step: Step,
    pub run: Run,
    pub events: Publisher,
}

/// The artifact a step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepProduct {
    Design(Value),
    Review(Review),
    CostAnalysis(Value),
    Document { markdown: String, diagrams: Vec<Diagram> },
}

impl StepProduct {
    pub fn kind(&self) -> &'static str {
        match self {
            StepProduct::Design(_) => "design",
            StepProduct::Review(_) => "review",
            StepProduct::CostAnalysis(_) => "cost analysis",
            StepProduct::Document { .. } => "document",
        }
    }
}

/// Result of one successful step invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub product: StepProduct,
    pub summary: String,
    pub cost_usd: f64,
    /// Measured by the executor when the handler leaves it out.
    pub duration_seconds: Option<f64>,
    pub model: Option<String>,
}

impl StepOutput {
    pub fn new(product: StepProduct, summary: impl Into<String>) -> Self {
        Self {
            product,
            summary: summary.into(),
            cost_usd: 0.0,
            duration_seconds: None,
            model: None,
        }
    }

    pub fn design(design: Value) -> Self {
        let summary = design
            .get("overview")
            .and_then(Value::as_str)
            .map(|s| s.chars().take(100).collect::<String>())
            .unwrap_or_else(|| "Design produced".to_string());
        Self::new(StepProduct::Design(design), summary)
    }

    pub fn review(review: Review) -> Self {
        let summary = format!(
            "{} finding(s), {} critical: {:?}",
            review.findings.len(),
            review.critical_count(),
            review.recommendation
        );
        Self::new(StepProduct::Review(review), summary)
    }

    pub fn cost_analysis(analysis: Value) -> Self {
        Self::new(StepProduct::CostAnalysis(analysis), "Cost analysis produced")
    }

    pub fn document(markdown: impl Into<String>, diagrams: Vec<Diagram>) -> Self {
        let summary = format!("Document with {} diagram(s)", diagrams.len());
        Self::new(
            StepProduct::Document {
                markdown: markdown.into(),
                diagrams,
            },
            summary,
        )
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_cost(mut self, usd: f64) -> Self {
        self.cost_usd = usd;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// One external reasoning step.
///
/// Implementations retry their own dependency as they see fit and surface
/// only terminal failures. The executor never retries a step.
#[async_trait]
pub trait StepHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError>;
}

/// Best-effort lookup of prior architectures similar to the requirements.
/// Failures degrade to an empty list.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn similar_architectures(&self, requirements: &str) -> Result<Vec<String>, StepError>;
}

/// Retriever used when no corpus of past architectures is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextRetriever for NoContext {
    async fn similar_architectures(&self, _requirements: &str) -> Result<Vec<String>, StepError> {
        Ok(Vec::new())
    }
}

/// The handlers a pipeline runs with.
///
/// The architect serves the initial design and both revision steps; it can
/// tell them apart through [`StepContext::step`].
#[derive(Clone)]
pub struct StepHandlers {
    pub architect: Arc<dyn StepHandler>,
    pub reviewer: Arc<dyn StepHandler>,
    pub cost_analyzer: Arc<dyn StepHandler>,
    pub documenter: Arc<dyn StepHandler>,
    pub context: Arc<dyn ContextRetriever>,
}

impl StepHandlers {
    pub fn new(
        architect: Arc<dyn StepHandler>,
        reviewer: Arc<dyn StepHandler>,
        cost_analyzer: Arc<dyn StepHandler>,
        documenter: Arc<dyn StepHandler>,
    ) -> Self {
        Self {
            architect,
            reviewer,
            cost_analyzer,
            documenter,
            context: Arc::new(NoContext),
        }
    }

    pub fn with_context(mut self, context: Arc<dyn ContextRetriever>) -> Self {
        self.context = context;
        self
    }

    /// Handler for a step. `None` for steps the executor runs itself.
    pub fn for_step(&self, step: Step) -> Option<&Arc<dyn StepHandler>> {
        match step {
            Step::Design | Step::ReviseFromValidation | Step::ReviseFromReview => {
                Some(&self.architect)
            }
            Step::Review => Some(&self.reviewer),
            Step::Cost => Some(&self.cost_analyzer),
            Step::Document => Some(&self.documenter),
            Step::RetrieveContext | Step::Validate => None,
        }
    }
}
