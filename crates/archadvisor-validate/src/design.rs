//! Read-only view over a design artifact.
//!
//! The artifact is untyped JSON. Accessors tolerate missing or mistyped
//! fields by returning empty values, so validators never have to guard
//! against malformed input themselves.

use serde_json::{Map, Value};

use crate::parse;

/// One entry of `components[]`.
#[derive(Debug, Clone)]
pub struct ComponentView<'a> {
    pub raw: &'a Value,
    /// Declared name, if any.
    pub name: Option<&'a str>,
    /// Lowercased `type`.
    pub kind: String,
    pub responsibility: &'a str,
    /// Lowercased `scaling_strategy`.
    pub scaling: String,
    /// Lowercased `tech_stack` entries.
    pub tech_stack: Vec<String>,
    /// Declared `sla` as a fraction.
    pub sla: Option<f64>,
    /// Lowercased JSON of the whole component.
    pub text: String,
}

impl<'a> ComponentView<'a> {
    fn new(raw: &'a Value) -> Self {
        let name = raw.get("name").and_then(Value::as_str);
        let kind = lower_str(raw.get("type"));
        let responsibility = raw
            .get("responsibility")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let scaling = lower_str(raw.get("scaling_strategy"));
        let tech_stack = raw
            .get("tech_stack")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default();
        let sla = raw
            .get("sla")
            .and_then(parse::parse_availability)
            .map(|pct| pct / 100.0);
        Self {
            raw,
            name,
            kind,
            responsibility,
            scaling,
            tech_stack,
            sla,
            text: raw.to_string().to_lowercase(),
        }
    }

    /// Name for messages; `Unknown` when undeclared.
    pub fn label(&self) -> &str {
        self.name.unwrap_or("Unknown")
    }

    /// Name, type, scaling strategy and tech stack, lowercased.
    pub fn profile(&self) -> String {
        format!(
            "{} {} {} {}",
            self.label().to_lowercase(),
            self.kind,
            self.scaling,
            self.tech_stack.join(" ")
        )
    }

    /// Name and tech stack, lowercased.
    pub fn identity(&self) -> String {
        format!("{} {}", self.label().to_lowercase(), self.tech_stack.join(" "))
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// One entry of `tech_decisions[]`.
#[derive(Debug, Clone, Copy)]
pub struct DecisionView<'a> {
    pub decision: &'a str,
    pub reasoning: &'a str,
}

/// A parsed-once view of the design shared by every validator in a pass.
#[derive(Debug, Clone)]
pub struct Design<'a> {
    raw: &'a Value,
    components: Vec<ComponentView<'a>>,
    flat: String,
}

impl<'a> Design<'a> {
    pub fn new(raw: &'a Value) -> Self {
        let components = raw
            .get("components")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|c| c.is_object())
                    .map(ComponentView::new)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            raw,
            components,
            flat: raw.to_string().to_lowercase(),
        }
    }

    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// Lowercased JSON of the whole design, for keyword searches.
    pub fn flat_text(&self) -> &str {
        &self.flat
    }

    pub fn components(&self) -> &[ComponentView<'a>] {
        &self.components
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.components.iter().filter(|c| c.is(kind)).count()
    }

    /// Every tech stack entry across all components.
    pub fn all_tech(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .flat_map(|c| c.tech_stack.iter().map(String::as_str))
    }

    /// `architecture_style`, lowercased with spaces as underscores.
    pub fn style(&self) -> String {
        lower_str(self.raw.get("architecture_style")).replace(' ', "_")
    }

    pub fn non_functional(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("non_functional").and_then(Value::as_object)
    }

    fn nf(&self, key: &str) -> Option<&'a Value> {
        self.non_functional().and_then(|nf| nf.get(key))
    }

    /// Declared availability target as a percentage.
    pub fn availability_target(&self) -> Option<f64> {
        self.nf("availability_target")
            .and_then(parse::parse_availability)
    }

    pub fn throughput(&self) -> Option<u64> {
        self.nf("throughput").and_then(parse::parse_throughput)
    }

    /// `data_consistency`, lowercased and trimmed; empty when absent.
    pub fn consistency(&self) -> String {
        lower_str(self.nf("data_consistency")).trim().to_string()
    }

    /// The p99 latency target, falling back to p50.
    pub fn latency_target_ms(&self) -> Option<f64> {
        let targets = self.nf("latency_targets")?;
        ["p99", "p50"]
            .iter()
            .filter_map(|key| targets.get(*key))
            .find_map(parse::parse_latency_ms)
    }

    /// Lowercased JSON of the `non_functional` section.
    pub fn non_functional_text(&self) -> String {
        self.section_text("non_functional")
    }

    /// Lowercased JSON of one top-level section; empty when absent.
    pub fn section_text(&self, key: &str) -> String {
        self.raw
            .get(key)
            .map(|v| v.to_string().to_lowercase())
            .unwrap_or_default()
    }

    pub fn decisions(&self) -> Vec<DecisionView<'a>> {
        self.raw
            .get("tech_decisions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|d| d.is_object())
                    .map(|d| DecisionView {
                        decision: d.get("decision").and_then(Value::as_str).unwrap_or_default(),
                        reasoning: d.get("reasoning").and_then(Value::as_str).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entries in `deployment.regions`.
    pub fn region_count(&self) -> usize {
        self.raw
            .get("deployment")
            .and_then(|d| d.get("regions"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

fn lower_str(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tolerates_garbage() {
        let raw = json!({"components": "nope", "non_functional": 7, "deployment": []});
        let design = Design::new(&raw);
        assert!(design.components().is_empty());
        assert_eq!(design.availability_target(), None);
        assert_eq!(design.region_count(), 0);
        assert_eq!(design.consistency(), "");
        assert!(design.decisions().is_empty());
    }

    #[test]
    fn test_component_fields() {
        let raw = json!({
            "architecture_style": "Event Driven",
            "components": [
                {"name": "Cache", "type": "CACHE", "tech_stack": ["Redis"], "sla": "99.95%"},
                "not a component"
            ],
            "non_functional": {"latency_targets": {"p50": "20ms"}}
        });
        let design = Design::new(&raw);
        assert_eq!(design.style(), "event_driven");
        assert_eq!(design.components().len(), 1);
        let cache = &design.components()[0];
        assert!(cache.is("cache"));
        assert_eq!(cache.tech_stack, vec!["redis"]);
        assert!((cache.sla.unwrap() - 0.9995).abs() < 1e-9);
        assert_eq!(design.latency_target_ms(), Some(20.0));
    }
}
