//! Fenced code blocks and balanced-delimiter spans in free text

use regex::Regex;
use std::sync::LazyLock;

/// One fenced block: language tag (lowercased, may be empty) and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub lang: String,
    pub body: &'a str,
    pub start: usize,
}

/// Opening fence with optional language tag, lazy body, closing fence
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+#.\-]*)[^\n]*\n(.*?)\n?[ \t]*```").unwrap()
});

/// All fenced blocks in document order
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    FENCE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = caps.get(2)?;
            Some(FencedBlock {
                lang: caps
                    .get(1)
                    .map(|m| m.as_str().to_ascii_lowercase())
                    .unwrap_or_default(),
                body: body.as_str(),
                start: whole.start(),
            })
        })
        .collect()
}

/// Largest block tagged with one of `langs` whose body is at least `min_len`
/// characters; when no tagged block qualifies, the largest untagged one.
/// Ties keep the first occurrence.
pub fn largest_fenced<'a>(text: &'a str, langs: &[&str], min_len: usize) -> Option<&'a str> {
    largest_fenced_checked(text, langs, min_len, |_| true)
}

/// Like [`largest_fenced`], but an untagged block only counts when
/// `untagged_ok` accepts its body. Tagged blocks are taken as they are.
pub fn largest_fenced_checked<'a, F>(
    text: &'a str,
    langs: &[&str],
    min_len: usize,
    untagged_ok: F,
) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    let blocks = fenced_blocks(text);

    let tagged = largest_of(
        blocks.iter().filter(|b| langs.iter().any(|l| b.lang == *l)),
        min_len,
    );
    tagged.or_else(|| {
        largest_of(
            blocks
                .iter()
                .filter(|b| b.lang.is_empty() && untagged_ok(b.body)),
            min_len,
        )
    })
}

/// Largest block of any language
pub fn largest_fenced_any(text: &str, min_len: usize) -> Option<&str> {
    largest_of(fenced_blocks(text).iter(), min_len)
}

fn largest_of<'a, 'b, I>(blocks: I, min_len: usize) -> Option<&'a str>
where
    I: Iterator<Item = &'b FencedBlock<'a>>,
    'a: 'b,
{
    let mut best: Option<&'a str> = None;
    for block in blocks {
        let len = block.body.trim().chars().count();
        if len < min_len {
            continue;
        }
        match best {
            Some(current) if current.trim().chars().count() >= len => {}
            _ => best = Some(block.body),
        }
    }
    best
}

/// Remove a surrounding fence (```lang ... ```) if the whole text is one block
pub fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let after_open = match trimmed.find('\n') {
        Some(i) => &trimmed[i + 1..],
        None => return trimmed.trim_start_matches('`').trim_end_matches('`').trim(),
    };
    after_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(after_open)
        .trim()
}

/// Top-level `open`..`close` spans, tracked with a depth counter. Delimiters
/// inside double-quoted strings are ignored. An opener that never closes is
/// skipped and the scan resumes right after it.
pub fn balanced_spans(text: &str, open: char, close: char) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut from = 0usize;

    while let Some(offset) = text[from..].find(open) {
        let start = from + offset;
        match span_len(&text[start..], open, close) {
            Some(len) => {
                spans.push(&text[start..start + len]);
                from = start + len;
            }
            None => from = start + open.len_utf8(),
        }
    }

    spans
}

/// Byte length of the balanced span at the head of `text`, which starts
/// with `open`. None when it never closes.
fn span_len(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + c.len_utf8());
            }
        } else if c == '"' {
            in_string = true;
        }
    }

    None
}

/// Balanced spans that `parse` accepts, with the parsed value. A rejected
/// span is searched again from the inside, so a malformed outer candidate
/// does not hide a valid one nested in it.
pub fn parsed_spans<'a, T>(
    text: &'a str,
    open: char,
    close: char,
    parse: &dyn Fn(&'a str) -> Option<T>,
) -> Vec<(&'a str, T)> {
    let mut found = Vec::new();
    for span in balanced_spans(text, open, close) {
        match parse(span) {
            Some(value) => found.push((span, value)),
            None => {
                let inner = &span[open.len_utf8()..span.len() - close.len_utf8()];
                found.extend(parsed_spans(inner, open, close, parse));
            }
        }
    }
    found
}
