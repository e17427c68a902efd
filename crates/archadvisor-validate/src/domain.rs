//! Domain rule packs.
//!
//! A rule file (`*.json`) names a business domain, the requirement keywords
//! that identify it, and three pattern lists. For a given requirements text
//! the domain with the most keyword hits is selected, provided it has at
//! least [`MIN_KEYWORD_HITS`]. Its mandatory and recommended patterns are
//! reported when the design lacks them; its anti-patterns are reported when
//! the design has them.
//!
//! ```json
//! {
//!   "domain": "payments",
//!   "display_name": "Payments",
//!   "keywords": ["payment", "card", "refund", "checkout"],
//!   "mandatory_patterns": [
//!     {"id": "PAY_IDEMPOTENCY", "check": "design_mentions_any",
//!      "terms": ["idempoten"], "severity": "critical",
//!      "message": "Payment writes need idempotency keys"}
//!   ],
//!   "recommended_patterns": [],
//!   "anti_patterns": []
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use archadvisor_types::{Finding, FindingCode, Severity};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::design::Design;
use crate::error::{Result, RulesError};
use crate::reference::ReferenceData;
use crate::validator::Validator;

/// Keyword hits a domain needs before its rules apply.
pub const MIN_KEYWORD_HITS: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// How a pattern's terms are looked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCheck {
    /// Anywhere in the design JSON.
    #[default]
    DesignMentionsAny,
    /// In component names, responsibilities, types, tech stacks, scaling
    /// strategies, endpoint descriptions and data stores.
    ComponentOrTechMentionsAny,
    /// As a substring of a component's type, name or tech stack entry.
    ComponentTypeExists,
    /// Unrecognized check names fall back to a design-wide search.
    #[serde(other)]
    Other,
}

/// A search term: a case-insensitive regex, or a plain substring when the
/// term does not compile.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub struct Term {
    source: String,
    lower: String,
    regex: Option<Regex>,
}

impl From<String> for Term {
    fn from(source: String) -> Self {
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .ok();
        Self {
            lower: source.to_lowercase(),
            source,
            regex,
        }
    }
}

impl From<&str> for Term {
    fn from(source: &str) -> Self {
        Term::from(source.to_string())
    }
}

impl Term {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_regex(&self) -> bool {
        self.regex.is_some()
    }

    fn found_in(&self, text: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(text),
            None => text.contains(&self.lower),
        }
    }
}

/// One mandatory, recommended or anti pattern.
#[derive(Debug, Clone, Deserialize)]
pub struct Pattern {
    /// Reported as the finding code.
    pub id: String,
    #[serde(default)]
    pub check: PatternCheck,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Pattern {
    /// Declared severity. `warning` counts as high, `info` as low, and
    /// anything else unrecognized as medium.
    pub fn severity(&self) -> Severity {
        let declared = self.severity.as_deref().map(str::to_lowercase);
        match declared.as_deref() {
            Some("critical") => Severity::Critical,
            Some("high" | "warning") => Severity::High,
            Some("low" | "info") => Severity::Low,
            _ => Severity::Medium,
        }
    }

    /// Whether the design contains this pattern's terms.
    pub fn present_in(&self, design: &Design<'_>) -> bool {
        match self.check {
            PatternCheck::DesignMentionsAny | PatternCheck::Other => self
                .terms
                .iter()
                .any(|term| term.found_in(design.flat_text())),
            PatternCheck::ComponentOrTechMentionsAny => {
                let text = component_text(design);
                self.terms.iter().any(|term| term.found_in(&text))
            }
            PatternCheck::ComponentTypeExists => design.components().iter().any(|c| {
                let name = c.name.unwrap_or_default().to_lowercase();
                self.terms.iter().any(|term| {
                    c.kind.contains(&term.lower)
                        || name.contains(&term.lower)
                        || c.tech_stack.iter().any(|t| t.contains(&term.lower))
                })
            }),
        }
    }

    fn finding(&self, domain: &str) -> Finding {
        let message = self
            .message
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_else(|| format!("Design does not satisfy domain pattern {}", self.id));
        let mut finding = Finding::new(FindingCode::Domain(self.id.clone()), self.severity(), message)
            .with_evidence(format!("Domain: {domain}"));
        if let Some(description) = &self.description {
            finding = finding.with_suggestion(description.clone());
        }
        finding
    }
}

/// Lowercased searchable text of every component.
fn component_text(design: &Design<'_>) -> String {
    let mut text = String::new();
    for c in design.components() {
        for part in [
            c.name.unwrap_or_default().to_lowercase(),
            c.responsibility.to_lowercase(),
            c.kind.clone(),
            c.tech_stack.join(" "),
            c.scaling.clone(),
        ] {
            text.push(' ');
            text.push_str(&part);
        }
        let endpoints = c.raw.get("api_endpoints").and_then(Value::as_array);
        for endpoint in endpoints.into_iter().flatten() {
            if let Some(description) = endpoint.get("description").and_then(Value::as_str) {
                text.push(' ');
                text.push_str(&description.to_lowercase());
            }
        }
        let stores = c.raw.get("data_stores").and_then(Value::as_array);
        for store in stores.into_iter().flatten().filter_map(Value::as_str) {
            text.push(' ');
            text.push_str(&store.to_lowercase());
        }
    }
    text
}

// ─────────────────────────────────────────────────────────────────────────────
// Domains
// ─────────────────────────────────────────────────────────────────────────────

/// The rules of one business domain.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainRules {
    /// Identifier; defaults to the rule file's stem.
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub mandatory_patterns: Vec<Pattern>,
    #[serde(default)]
    pub recommended_patterns: Vec<Pattern>,
    #[serde(default)]
    pub anti_patterns: Vec<Pattern>,
}

impl DomainRules {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Name for messages.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.domain)
    }

    /// Distinct keywords found in the (lowercased) requirements.
    pub fn keyword_hits(&self, requirements: &str) -> usize {
        self.keywords
            .iter()
            .filter(|kw| requirements.contains(&kw.to_lowercase()))
            .count()
    }

    /// Missing mandatory and recommended patterns, then present
    /// anti-patterns.
    pub fn check(&self, design: &Design<'_>) -> Vec<Finding> {
        let name = self.name();
        let missing = self
            .mandatory_patterns
            .iter()
            .chain(&self.recommended_patterns)
            .filter(|p| !p.present_in(design));
        let present = self.anti_patterns.iter().filter(|p| p.present_in(design));
        missing.chain(present).map(|p| p.finding(name)).collect()
    }
}

/// Every loaded domain.
#[derive(Debug, Clone, Default)]
pub struct DomainCatalog {
    domains: Vec<DomainRules>,
}

impl DomainCatalog {
    pub fn new(domains: Vec<DomainRules>) -> Self {
        Self { domains }
    }

    /// Load every `*.json` file in `dir`, in file name order. Files that
    /// can't be read or parsed are skipped with a warning; a later file
    /// naming the same domain replaces an earlier one.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| RulesError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut catalog = DomainCatalog::default();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|text| DomainRules::from_json(&text).map_err(|e| e.to_string()));
            match parsed {
                Ok(mut rules) => {
                    if rules.domain.is_empty() {
                        rules.domain = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default();
                    }
                    catalog.insert(rules);
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable domain rule file");
                }
            }
        }
        info!(dir = %dir.display(), domains = catalog.len(), "Loaded domain rules");
        Ok(catalog)
    }

    /// Add a domain, replacing any with the same identifier.
    pub fn insert(&mut self, rules: DomainRules) {
        match self.domains.iter_mut().find(|d| d.domain == rules.domain) {
            Some(existing) => *existing = rules,
            None => self.domains.push(rules),
        }
    }

    pub fn domains(&self) -> &[DomainRules] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// The domain with the most keyword hits, if it reaches
    /// [`MIN_KEYWORD_HITS`]. Ties go to the earlier domain.
    pub fn detect(&self, requirements: &str) -> Option<&DomainRules> {
        let requirements = requirements.to_lowercase();
        let mut best: Option<(&DomainRules, usize)> = None;
        for rules in &self.domains {
            let hits = rules.keyword_hits(&requirements);
            if hits > best.map_or(0, |(_, h)| h) {
                best = Some((rules, hits));
            }
        }
        best.filter(|(_, hits)| *hits >= MIN_KEYWORD_HITS)
            .map(|(rules, _)| rules)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator
// ─────────────────────────────────────────────────────────────────────────────

/// Checks a design against the rules of the domain its requirements
/// describe. Reports nothing when no domain is detected.
#[derive(Debug, Clone, Default)]
pub struct DomainPatternValidator {
    catalog: DomainCatalog,
}

impl DomainPatternValidator {
    pub fn new(catalog: DomainCatalog) -> Self {
        Self { catalog }
    }

    /// Load rule files from a directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        DomainCatalog::load_dir(dir).map(Self::new)
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    /// Display name of the domain the requirements describe.
    pub fn detected_domain(&self, requirements: &str) -> Option<&str> {
        self.catalog.detect(requirements).map(DomainRules::name)
    }
}

impl Validator for DomainPatternValidator {
    fn name(&self) -> &str {
        "domain_pattern"
    }

    fn check(&self, design: &Design<'_>, requirements: &str, _: &ReferenceData) -> Vec<Finding> {
        let Some(rules) = self.catalog.detect(requirements) else {
            return Vec::new();
        };
        debug!(domain = %rules.domain, "Domain detected");
        rules.check(design)
    }
}
