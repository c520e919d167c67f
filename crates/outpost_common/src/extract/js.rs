//! JavaScript extraction strategies

use super::fence::largest_fenced_checked;
use super::{field_text, ExtractionInput, Strategy};
use regex::Regex;
use std::sync::LazyLock;

/// Code-like lines needed before a fragment is reassembled
const MIN_CODE_LINES: usize = 3;

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script([^>]*)>(.*?)</script\s*>").unwrap());

static CODE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:async\s+)?function\s*\w*\s*\(|(?:const|let|var)\s+[\w${}\[\], ]+\s*=|class\s+\w+|(?:document|window|console|module)\.|import\s+.+from\s|export\s+|[\w$.]+\.addEventListener\s*\(|[\w$.]+\s*=\s*(?:function|\(.*\)\s*=>)|return\b|if\s*\(|for\s*\(|while\s*\()",
    )
    .unwrap()
});

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_js", 10, fenced_js),
        Strategy::new("script_tag", 10, script_tag),
        Strategy::new("reconstructed_js", 20, reconstructed_js),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(
        input.fields,
        input.output_name,
        &["js", "javascript", "javascript_code", "script", "js_code", "scripts"],
    )
}

fn fenced_js(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced_checked(
        input.text,
        &["javascript", "js", "jsx", "mjs", "typescript", "ts"],
        10,
        |body| body.lines().any(|line| CODE_LINE.is_match(line)),
    )
    .map(String::from)
}

/// Inline script bodies; `<script src=...>` references are skipped
fn script_tag(input: &ExtractionInput<'_>) -> Option<String> {
    let bodies: Vec<&str> = SCRIPT_TAG
        .captures_iter(input.text)
        .filter(|caps| {
            caps.get(1)
                .map(|attrs| !attrs.as_str().contains("src="))
                .unwrap_or(true)
        })
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str().trim())
        .filter(|body| !body.is_empty())
        .collect();
    if bodies.is_empty() {
        None
    } else {
        Some(bodies.join("\n\n"))
    }
}

/// Take the span from the first to the last code-like line, pull in
/// trailing closers, then balance any braces left open.
fn reconstructed_js(input: &ExtractionInput<'_>) -> Option<String> {
    let lines: Vec<&str> = input.text.lines().collect();
    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| CODE_LINE.is_match(line))
        .map(|(i, _)| i)
        .collect();
    if hits.len() < MIN_CODE_LINES {
        return None;
    }

    let first = hits[0];
    let mut last = hits[hits.len() - 1];
    while last + 1 < lines.len() && is_closer(lines[last + 1]) {
        last += 1;
    }

    let mut fragment = lines[first..=last].join("\n");
    let open = fragment.matches('{').count();
    let close = fragment.matches('}').count();
    for _ in close..open {
        fragment.push_str("\n}");
    }
    Some(fragment)
}

fn is_closer(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| matches!(c, '}' | ')' | ']' | ';'))
}
