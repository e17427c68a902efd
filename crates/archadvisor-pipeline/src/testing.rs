//! Scripted step handlers and fixtures for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use archadvisor_types::{Diagram, Review, ReviewFinding, ReviewRecommendation, Severity};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::StepError;
use crate::handler::{ContextRetriever, StepContext, StepHandler, StepHandlers, StepOutput};
use crate::step::Step;

/// Requirements that a [`passing_design`] satisfies without findings.
pub const REQUIREMENTS: &str = "Build an order processing platform that accepts customer orders \
                                and fulfils them reliably for a regional retailer.";

enum Scripted {
    Output(StepOutput),
    Fail(String),
}

/// A step handler that replays queued outputs.
///
/// Queued entries are consumed in order; once the queue is empty the
/// repeating output (if any) is returned for every further call, otherwise
/// the call fails.
pub struct ScriptedHandler {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    repeat: Option<StepOutput>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    steps: Mutex<Vec<Step>>,
}

impl ScriptedHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            delay: None,
            calls: AtomicUsize::new(0),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Handler that returns `output` on every call.
    pub fn always(name: impl Into<String>, output: StepOutput) -> Self {
        Self::new(name).repeating(output)
    }

    /// Queue one output.
    pub fn then(self, output: StepOutput) -> Self {
        self.script.lock().push_back(Scripted::Output(output));
        self
    }

    /// Queue one terminal failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn repeating(mut self, output: StepOutput) -> Self {
        self.repeat = Some(output);
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Steps this handler was invoked for, in order.
    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().clone()
    }
}

#[async_trait]
impl StepHandler for ScriptedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps.lock().push(ctx.step);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Fail(message)) => Err(StepError::failed(ctx.step, message)),
            None => self
                .repeat
                .clone()
                .ok_or_else(|| StepError::failed(ctx.step, format!("{}: script exhausted", self.name))),
        }
    }
}

/// Retriever returning a fixed list, or failing when built with
/// [`StaticRetriever::failing`].
pub struct StaticRetriever {
    similar: Option<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(similar: Vec<String>) -> Self {
        Self {
            similar: Some(similar),
        }
    }

    pub fn failing() -> Self {
        Self { similar: None }
    }
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn similar_architectures(&self, _requirements: &str) -> Result<Vec<String>, StepError> {
        self.similar
            .clone()
            .ok_or_else(|| StepError::failed(Step::RetrieveContext, "vector store unavailable"))
    }
}

/// A design with no findings against [`REQUIREMENTS`].
pub fn passing_design() -> Value {
    json!({
        "overview": "Order intake and fulfilment for a regional retailer.",
        "architecture_style": "microservices",
        "components": [
            {
                "name": "Order API",
                "type": "service",
                "responsibility": "Accepts and validates orders",
                "tech_stack": ["Go"],
                "scaling_strategy": "Horizontal auto-scaling behind a load balancer",
                "sla": "99.99%"
            },
            {
                "name": "Orders DB",
                "type": "database",
                "responsibility": "Durable order storage",
                "tech_stack": ["PostgreSQL"],
                "scaling_strategy": "Primary with read replica, multi-AZ failover",
                "sla": "99.99%"
            },
            {
                "name": "Worker",
                "type": "service",
                "responsibility": "Fulfils orders asynchronously",
                "tech_stack": ["Go"],
                "scaling_strategy": "Horizontal auto-scaling",
                "sla": "99.99%"
            }
        ],
        "non_functional": {
            "availability_target": "99.9%",
            "throughput": "2000 rps",
            "data_consistency": "strong",
            "latency_targets": {"p50": "50ms", "p99": "200ms"}
        },
        "tech_decisions": [
            {"decision": "PostgreSQL for orders", "reasoning": "Relational integrity for order state"}
        ],
        "deployment": {"regions": ["us-east-1"], "strategy": "multi-az"}
    })
}

/// A design that fails validation: a single-instance database.
pub fn failing_design() -> Value {
    let mut design = passing_design();
    design["components"][1]["scaling_strategy"] = json!("single instance");
    design
}

pub fn proceed_review() -> Review {
    Review::new(ReviewRecommendation::Proceed).with_finding(ReviewFinding::new(
        Severity::Low,
        "observability",
        "Add tracing around the fulfilment worker",
    ))
}

pub fn critical_review() -> Review {
    Review::new(ReviewRecommendation::ReviseCritical)
        .with_finding(
            ReviewFinding::new(Severity::Critical, "data", "Orders can be double-fulfilled")
                .with_component("Worker"),
        )
        .with_finding(ReviewFinding::new(
            Severity::Medium,
            "cost",
            "Three availability zones may be excessive",
        ))
}

/// Handlers whose cost and document steps always succeed.
pub fn handlers(architect: Arc<ScriptedHandler>, reviewer: Arc<ScriptedHandler>) -> StepHandlers {
    StepHandlers::new(
        architect,
        reviewer,
        Arc::new(ScriptedHandler::always(
            "cost",
            StepOutput::cost_analysis(json!({"monthly_usd": 420})).with_cost(0.01),
        )),
        Arc::new(ScriptedHandler::always(
            "document",
            StepOutput::document(
                "# Order platform\n",
                vec![Diagram {
                    kind: "architecture".to_string(),
                    title: "Overview".to_string(),
                    mermaid_code: "graph TD; API-->DB".to_string(),
                }],
            )
            .with_cost(0.02),
        )),
    )
}
