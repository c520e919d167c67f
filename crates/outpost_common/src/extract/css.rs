//! CSS extraction strategies

use super::fence::largest_fenced_checked;
use super::{field_text, ExtractionInput, Strategy};
use regex::Regex;
use std::sync::LazyLock;

/// Loose pairs needed before a synthetic rule is built
const MIN_LOOSE_PAIRS: usize = 3;

/// Complete rules needed before they are collected
const MIN_RULES: usize = 2;

static STYLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style\s*>").unwrap());

static RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([.#*:\[a-zA-Z@][^{}\n]{0,120}?)\s*\{([^{}]*:[^{}]*)\}").unwrap()
});

static LOOSE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(-{0,2}[a-z][a-z-]*)[ \t]*:[ \t]*([^;{}\n]+?)[ \t]*;").unwrap()
});

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_css", 10, fenced_css),
        Strategy::new("style_tag", 10, style_tag),
        Strategy::new("reconstructed_css", 10, reconstructed_css),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(
        input.fields,
        input.output_name,
        &["css", "css_styles", "stylesheet", "styles", "style", "css_content"],
    )
}

fn fenced_css(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced_checked(input.text, &["css", "scss", "less"], 10, |body| {
        body.contains('{') && body.contains(':')
    })
    .map(String::from)
}

fn style_tag(input: &ExtractionInput<'_>) -> Option<String> {
    let bodies: Vec<&str> = STYLE_TAG
        .captures_iter(input.text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|body| !body.is_empty())
        .collect();
    if bodies.is_empty() {
        None
    } else {
        Some(bodies.join("\n\n"))
    }
}

/// Collect complete rules scattered through prose, or wrap loose
/// `property: value;` pairs in a synthetic `body` rule.
fn reconstructed_css(input: &ExtractionInput<'_>) -> Option<String> {
    let rules: Vec<&str> = RULE
        .find_iter(input.text)
        .map(|m| m.as_str().trim())
        .collect();
    if rules.len() >= MIN_RULES {
        return Some(rules.join("\n\n"));
    }

    let pairs: Vec<String> = LOOSE_PAIR
        .captures_iter(input.text)
        .filter_map(|caps| {
            let property = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str().trim();
            Some(format!("  {}: {};", property, value))
        })
        .collect();
    if pairs.len() >= MIN_LOOSE_PAIRS {
        return Some(format!("body {{\n{}\n}}", pairs.join("\n")));
    }

    None
}
