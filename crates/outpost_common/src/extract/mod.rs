//! Per-type content extraction
//!
//! Each output type gets a `ContentExtractor`: an ordered list of named
//! strategies, each with its own minimum-length gate. The first strategy whose
//! result clears its gate wins; its result is unescaped and returned.
//! Strategies are plain functions over `ExtractionInput` and never mutate
//! shared state, so they can be tested and reordered independently.

pub mod css;
pub mod fence;
pub mod html;
pub mod js;
pub mod json;
pub mod markdown;
pub mod text;

use crate::outputs::OutputType;
use crate::unescape::unescape_with_ratio;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Everything a strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    /// Normalized response text
    pub text: &'a str,
    /// Candidate fields from the structured data extractor
    pub fields: &'a Map<String, Value>,
    /// Name of the output being resolved
    pub output_name: &'a str,
}

pub type StrategyFn = fn(&ExtractionInput<'_>) -> Option<String>;

/// A named extraction strategy with its minimum-length gate
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub min_len: usize,
    pub run: StrategyFn,
}

impl Strategy {
    pub const fn new(name: &'static str, min_len: usize, run: StrategyFn) -> Self {
        Self { name, min_len, run }
    }

    /// Run the strategy and apply its gate
    pub fn apply(&self, input: &ExtractionInput<'_>) -> Option<String> {
        let found = (self.run)(input)?;
        let len = found.trim().chars().count();
        if len == 0 || len < self.min_len {
            debug!(
                "Strategy {} for '{}' below gate ({} < {})",
                self.name, input.output_name, len, self.min_len
            );
            return None;
        }
        Some(found)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("min_len", &self.min_len)
            .finish()
    }
}

/// Which extractor family handles an output type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Html,
    Css,
    Js,
    Json,
    Markdown,
    Text,
}

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    kind: ExtractorKind,
    strategies: Vec<Strategy>,
}

impl ContentExtractor {
    pub fn for_type(output_type: OutputType) -> Self {
        let (kind, strategies) = match output_type {
            OutputType::Html => (ExtractorKind::Html, html::strategies()),
            OutputType::Css => (ExtractorKind::Css, css::strategies()),
            OutputType::Js => (ExtractorKind::Js, js::strategies()),
            OutputType::Json => (ExtractorKind::Json, json::strategies()),
            OutputType::Markdown => (ExtractorKind::Markdown, markdown::strategies()),
            OutputType::Code => (ExtractorKind::Text, text::code_strategies()),
            OutputType::Text | OutputType::Table | OutputType::List => {
                (ExtractorKind::Text, text::strategies())
            }
        };
        Self { kind, strategies }
    }

    pub fn kind(&self) -> ExtractorKind {
        self.kind
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Run the cascade; `None` is an extraction miss, not an error
    pub fn extract(&self, input: &ExtractionInput<'_>, unescape_ratio: f64) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(found) = strategy.apply(input) {
                debug!(
                    "Output '{}' resolved by {:?}/{}",
                    input.output_name, self.kind, strategy.name
                );
                return Some(unescape_with_ratio(&found, unescape_ratio));
            }
        }
        debug!("Output '{}' not found by {:?} extractor", input.output_name, self.kind);
        None
    }
}

/// Lowercase, with spaces and hyphens folded to underscores
pub(crate) fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Look up the output name, then the type's alternate names, in the
/// candidate fields. Exact keys win over normalized matches.
pub(crate) fn field_text(
    fields: &Map<String, Value>,
    output_name: &str,
    alternates: &[&str],
) -> Option<String> {
    let names = std::iter::once(output_name).chain(alternates.iter().copied());

    for name in names.clone() {
        if let Some(text) = fields.get(name).and_then(value_text) {
            return Some(text);
        }
    }

    for name in names {
        let wanted = normalize_key(name);
        let hit = fields
            .iter()
            .find(|(key, _)| normalize_key(key) == wanted)
            .and_then(|(_, value)| value_text(value));
        if hit.is_some() {
            return hit;
        }
    }

    None
}

/// Render a field value as text: strings as-is, string lists one per line,
/// other structures pretty-printed.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.iter().all(Value::is_string) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => serde_json::to_string_pretty(other).ok(),
    }
}
