//! Display formatting for DISPLAY outputs

use crate::outputs::{OutputContent, OutputDefinition, OutputType};
use crate::unescape::unescape_with_ratio;
use serde_json::Value;

/// Separator between displayed sections
pub const SECTION_SEPARATOR: &str = "\n\n";

/// Formats one displayed output at a time. Tracks the last group seen so a
/// group label is emitted once per run of outputs sharing it.
#[derive(Debug, Clone)]
pub struct DisplayFormatter {
    headings: bool,
    unescape_ratio: f64,
    last_group: Option<String>,
}

impl DisplayFormatter {
    pub fn new(headings: bool, unescape_ratio: f64) -> Self {
        Self {
            headings,
            unescape_ratio,
            last_group: None,
        }
    }

    pub fn format(&mut self, definition: &OutputDefinition, content: &OutputContent) -> String {
        let body = format_body(definition.output_type, content, self.unescape_ratio);
        if !self.headings {
            return body;
        }

        let mut section = String::new();
        if let Some(group) = &definition.group {
            if self.last_group.as_deref() != Some(group.as_str()) {
                section.push_str(&format!("# {}\n\n", group));
                self.last_group = Some(group.clone());
            }
        }
        section.push_str(&format!("## {}\n\n{}", definition.title(), body));
        section
    }
}

/// Render content for display according to its type
pub fn format_body(output_type: OutputType, content: &OutputContent, unescape_ratio: f64) -> String {
    match output_type {
        OutputType::Json => fenced("json", &json_text(content, unescape_ratio)),
        OutputType::Code => fenced("", &text(content, unescape_ratio)),
        OutputType::Html => fenced("html", &text(content, unescape_ratio)),
        OutputType::Css => fenced("css", &text(content, unescape_ratio)),
        OutputType::Js => fenced("javascript", &text(content, unescape_ratio)),
        OutputType::Markdown | OutputType::Text | OutputType::Table | OutputType::List => {
            text(content, unescape_ratio)
        }
    }
}

fn text(content: &OutputContent, unescape_ratio: f64) -> String {
    unescape_with_ratio(&content.as_text(), unescape_ratio)
        .trim()
        .to_string()
}

fn json_text(content: &OutputContent, unescape_ratio: f64) -> String {
    let parsed = match content {
        OutputContent::Structured(value) if !value.is_string() => Some(value.clone()),
        _ => serde_json::from_str::<Value>(text(content, unescape_ratio).as_str()).ok(),
    };
    match parsed {
        Some(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        None => text(content, unescape_ratio),
    }
}

/// Wrap in a fence unless the text is already fenced
fn fenced(lang: &str, body: &str) -> String {
    if body.starts_with("```") {
        body.to_string()
    } else {
        format!("```{}\n{}\n```", lang, body)
    }
}
