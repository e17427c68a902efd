//! Deterministic validation of architecture designs.
//!
//! Seven independent [`Validator`]s inspect a design (untyped JSON produced
//! by the design step) and the original requirements text, and the
//! [`ValidationEngine`] folds their findings into a scored
//! [`ValidationReport`](archadvisor_types::ValidationReport). Nothing in a
//! pass performs I/O, so it costs well under a millisecond for realistic
//! designs and can gate every expensive step that follows.
//!
//! Domain rule packs ([`DomainPatternValidator`]) are loaded from JSON files
//! once, up front, and join the chain through
//! [`ValidationEngine::with_domain_rules`].
//!
//! ```
//! use archadvisor_validate::ValidationEngine;
//! use serde_json::json;
//!
//! let engine = ValidationEngine::new();
//! let report = engine.run_all(&json!({"overview": "todo"}), "");
//! assert!(!report.passed);
//! ```

pub mod design;
pub mod domain;
pub mod engine;
pub mod error;
pub mod parse;
pub mod reference;
pub mod rules;
pub mod validator;

pub use design::{ComponentView, Design};
pub use domain::{DomainCatalog, DomainPatternValidator, DomainRules, Pattern, PatternCheck};
pub use engine::ValidationEngine;
pub use error::{Result, RulesError};
pub use reference::{Benchmark, ReferenceData, RequirementRule};
pub use rules::{
    AvailabilityValidator, CapacityValidator, ComplexityValidator, ConsistencyValidator,
    ContradictionValidator, CoverageValidator, SchemaValidator,
};
pub use validator::Validator;
