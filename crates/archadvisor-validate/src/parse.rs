//! Lenient parsers for the free-form values designs carry.
//!
//! Designs are produced by a reasoning step, so numbers arrive as JSON numbers
//! or as strings like `"10K RPS"`, `"99.99%"`, `"four nines"` or `"0.2s"`.
//! Every parser returns `None` rather than failing on input it can't read.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// A number followed by the word that comes right after it.
static NUMBER_WITH_UNIT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([a-zµ]*)").ok());

/// Rate units that may trail a magnitude suffix, as in `10krps`.
const RATE_UNITS: &[&str] = &["rps", "qps", "tps", "ops", "req", "reqs", "requests"];

const NAMED_NINES: &[(&str, f64)] = &[
    ("two nines", 99.0),
    ("three nines", 99.9),
    ("four nines", 99.99),
    ("five nines", 99.999),
    ("six nines", 99.9999),
];

fn number_and_unit(text: &str) -> Option<(f64, String)> {
    let cleaned = text.to_lowercase().replace(',', "");
    let re = NUMBER_WITH_UNIT.as_ref()?;
    let caps = re.captures(&cleaned)?;
    let number = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
    Some((number, unit))
}

fn magnitude(unit: &str) -> f64 {
    match unit {
        "thousand" => return 1e3,
        "million" => return 1e6,
        "billion" => return 1e9,
        _ => {}
    }
    let mut chars = unit.chars();
    let scale = match chars.next() {
        Some('k') => 1e3,
        Some('m') => 1e6,
        Some('b') => 1e9,
        _ => return 1.0,
    };
    let rest = chars.as_str();
    if rest.is_empty() || RATE_UNITS.contains(&rest) {
        scale
    } else {
        // "msg/s", "mps" and friends are units, not magnitudes.
        1.0
    }
}

/// Requests (or messages) per second.
///
/// Only a `k`/`m`/`b` directly attached to the first number scales it, so
/// `"500 msg/s"` is 500, not 500 million.
pub fn parse_throughput(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64),
        Value::String(s) => {
            let (number, unit) = number_and_unit(s)?;
            Some((number * magnitude(&unit)) as u64)
        }
        _ => None,
    }
}

/// Availability as a percentage (`99.9`, not `0.999`).
///
/// Values at or below 1 are read as fractions.
pub fn parse_availability(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let text = s.trim().to_lowercase();
            if let Some((_, pct)) = NAMED_NINES.iter().find(|(name, _)| text.contains(name)) {
                return Some(*pct);
            }
            text.trim_end_matches('%').trim().parse::<f64>().ok()?
        }
        _ => return None,
    };
    if raw <= 1.0 { Some(raw * 100.0) } else { Some(raw) }
}

/// Latency in milliseconds. Bare numbers are milliseconds.
pub fn parse_latency_ms(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let (number, unit) = number_and_unit(s)?;
            let ms = match unit.as_str() {
                "s" | "sec" | "secs" | "second" | "seconds" => number * 1000.0,
                "us" | "µs" => number / 1000.0,
                _ => number,
            };
            Some(ms)
        }
        _ => None,
    }
}

/// Whether `text` mentions `keyword`.
///
/// Keywords of three characters or fewer (`dr`, `sqs`, `k8s`) must stand
/// alone as a word; longer keywords match anywhere. Both sides are expected
/// lowercase.
pub fn mentions(text: &str, keyword: &str) -> bool {
    if keyword.chars().count() > 3 {
        return text.contains(keyword);
    }
    let is_word = |c: char| c.is_ascii_alphanumeric();
    text.match_indices(keyword).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Whether `text` mentions any of `keywords`.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| mentions(text, kw))
}

/// First keyword that `text` mentions.
pub fn first_match<'k>(text: &str, keywords: &[&'k str]) -> Option<&'k str> {
    keywords.iter().copied().find(|kw| mentions(text, kw))
}
