//! The seven built-in validators.

mod availability;
mod capacity;
mod complexity;
mod consistency;
mod contradiction;
mod coverage;
mod schema;

pub use availability::{AvailabilityValidator, component_availability};
pub use capacity::CapacityValidator;
pub use complexity::ComplexityValidator;
pub use consistency::ConsistencyValidator;
pub use contradiction::ContradictionValidator;
pub use coverage::CoverageValidator;
pub use schema::SchemaValidator;
