//! Step-graph execution for ArchAdvisor runs.
//!
//! A run walks a fixed graph of steps. Two of the edges loop back:
//!
//! - the **validation gate** sends a failing design back to the architect at
//!   most [`MAX_VALIDATION_ROUNDS`] times, then forces it through to review;
//! - the **debate gate** sends a design back whenever the reviewer asks for
//!   revision, at most `preferences.max_debate_rounds` times, then forces it
//!   through to cost analysis.
//!
//! Reasoning steps are [`StepHandler`]s supplied by the caller. Validation
//! runs in-process through the
//! [`ValidationEngine`](archadvisor_validate::ValidationEngine). The
//! [`Executor`] wraps every step in the same envelope (status write, started
//! event, invocation, message and cost persisted as one patch, completed
//! event), and the [`Orchestrator`] is the service object transports talk to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  submit/cancel/status  ┌──────────────┐
//! │  Transport   │ ─────────────────────▶ │ Orchestrator │
//! └──────────────┘                        └──────┬───────┘
//!        ▲ events                                │ spawn per run
//! ┌──────┴───────┐      publish           ┌──────▼───────┐    patch    ┌──────────┐
//! │   EventBus   │ ◀───────────────────── │   Executor   │ ──────────▶ │ RunStore │
//! └──────────────┘                        └──────────────┘             └──────────┘
//! ```

pub mod error;
pub mod executor;
pub mod handler;
pub mod orchestrator;
pub mod step;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{PipelineError, Result, StepError};
pub use executor::{Executor, MAX_REVIEW_FINDING_EVENTS, MAX_VALIDATION_FINDING_EVENTS};
pub use handler::{
    ContextRetriever, NoContext, StepContext, StepHandler, StepHandlers, StepOutput, StepProduct,
};
pub use orchestrator::Orchestrator;
pub use step::{MAX_VALIDATION_ROUNDS, Step, route_after_review, route_after_validation};
