//! Markdown extraction strategies
//!
//! Besides fields and fences, markdown outputs can be found as a section
//! under a heading named after the output, or as the densest run of
//! markdown syntax in the response.

use super::fence::largest_fenced;
use super::{field_text, ExtractionInput, Strategy};
use regex::Regex;
use std::sync::LazyLock;

/// Lines per window when scoring markdown density
pub const DENSITY_WINDOW: usize = 6;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.+?)[ \t#]*$").unwrap());

static CONSTRUCTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^#{1,6}\s+\S",          // heading
        r"^\s*[-*+]\s+\S",        // bullet
        r"^\s*\d+[.)]\s+\S",      // ordered item
        r"^\s*>",                 // quote
        r"^\s*```",               // fence
        r"^\s*\|.*\|\s*$",        // table row
        r"^\s*(?:-{3,}|\*{3,})\s*$", // rule
        r"\*\*[^*]+\*\*",         // bold
        r"\[[^\]]+\]\([^)]+\)",   // link
        r"`[^`]+`",               // inline code
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_markdown", 20, fenced_markdown),
        Strategy::new("named_section", 10, named_section),
        Strategy::new("densest_block", 20, densest_block),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(
        input.fields,
        input.output_name,
        &["markdown", "markdown_content", "md", "content_md"],
    )
}

fn fenced_markdown(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced(input.text, &["markdown", "md"], 20).map(String::from)
}

fn named_section(input: &ExtractionInput<'_>) -> Option<String> {
    section_for(input.text, input.output_name)
}

fn densest_block(input: &ExtractionInput<'_>) -> Option<String> {
    densest_markdown(input.text, DENSITY_WINDOW)
}

/// Fold a heading or output name for comparison: case, separators, and
/// punctuation are ignored.
pub(crate) fn heading_key(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Body of the section whose heading names `output_name`, up to the next
/// heading of the same or a higher level.
pub(crate) fn section_for(text: &str, output_name: &str) -> Option<String> {
    let wanted = heading_key(output_name);
    if wanted.is_empty() {
        return None;
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut in_fence = false;
    let mut start: Option<(usize, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(caps) = HEADING.captures(line) else {
            continue;
        };
        let level = caps.get(1).map(|m| m.as_str().len()).unwrap_or(1);
        let title = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        match start {
            None if heading_key(title) == wanted => start = Some((i + 1, level)),
            Some((from, open_level)) if level <= open_level => {
                return non_empty(lines[from..i].join("\n"));
            }
            _ => {}
        }
    }

    start.and_then(|(from, _)| non_empty(lines[from..].join("\n")))
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Number of markdown constructs on one line
pub(crate) fn construct_count(line: &str) -> usize {
    CONSTRUCTS.iter().filter(|re| re.is_match(line)).count()
}

/// Highest-density window of `window` lines, grown outward over adjacent
/// markdown or blank lines.
pub(crate) fn densest_markdown(text: &str, window: usize) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() || window == 0 {
        return None;
    }
    let width = window.min(lines.len());
    let scores: Vec<usize> = lines.iter().map(|l| construct_count(l)).collect();

    let mut best_start = 0;
    let mut best_score = 0;
    for start in 0..=lines.len() - width {
        let score: usize = scores[start..start + width].iter().sum();
        if score > best_score {
            best_score = score;
            best_start = start;
        }
    }
    if best_score == 0 {
        return None;
    }

    let keep = |i: usize| scores[i] > 0 || lines[i].trim().is_empty();
    let mut from = best_start;
    let mut to = best_start + width;
    while from > 0 && keep(from - 1) {
        from -= 1;
    }
    while to < lines.len() && keep(to) {
        to += 1;
    }

    // Trim prose at the window edges
    while from < to && scores[from] == 0 {
        from += 1;
    }
    while to > from && scores[to - 1] == 0 {
        to -= 1;
    }

    non_empty(lines[from..to].join("\n"))
}
