//! The validator seam.

use archadvisor_types::Finding;

use crate::design::Design;
use crate::reference::ReferenceData;

/// A deterministic rule set checked against a design.
///
/// Implementations must be pure: no I/O, no randomness, no shared state.
/// An absent problem is an empty result, never an error, and malformed
/// optional fields are ignored rather than reported (that is the schema
/// validator's job).
pub trait Validator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// All findings for this design.
    fn check(&self, design: &Design<'_>, requirements: &str, reference: &ReferenceData)
    -> Vec<Finding>;
}
