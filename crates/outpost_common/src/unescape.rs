//! Escaped-content detection and repair
//!
//! Model output often arrives with its newlines and quotes still escaped
//! (`\n`, `\"`), typically because a JSON string was embedded in text without
//! being decoded. Code bodies, on the other hand, may legitimately contain
//! those sequences. Unescaping only happens when escaped newlines clearly
//! outnumber literal ones.

/// Literal newlines must be fewer than `ratio * escaped_newlines`
pub const DEFAULT_UNESCAPE_RATIO: f64 = 2.0;

/// Manual replacement table, longer sequences first
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\\\\n", "\n"),
    ("\\\\t", "\t"),
    ("\\\\r", "\r"),
    ("\\n", "\n"),
    ("\\t", "\t"),
    ("\\\"", "\""),
    ("\\\\", "\\"),
    ("\\r", "\r"),
    ("\\b", "\u{8}"),
    ("\\f", "\u{c}"),
];

/// Unescape with the default ratio
pub fn unescape(text: &str) -> String {
    unescape_with_ratio(text, DEFAULT_UNESCAPE_RATIO)
}

/// Unescape `text` if it looks literally escaped, otherwise return it unchanged
pub fn unescape_with_ratio(text: &str, ratio: f64) -> String {
    if !looks_escaped(text, ratio) {
        return text.to_string();
    }

    if let Some(decoded) = decode_as_json_string(text) {
        if decoded != text {
            return decoded;
        }
    }

    replace_sequences(text)
}

/// True when escaped newlines outnumber literal ones by the given ratio
pub fn looks_escaped(text: &str, ratio: f64) -> bool {
    let escaped = text.matches("\\n").count();
    if escaped == 0 {
        return false;
    }
    let literal = text.matches('\n').count();
    (literal as f64) < ratio * escaped as f64
}

fn decode_as_json_string(text: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", text)).ok()
}

/// Single left-to-right pass over the table so a replaced sequence is never
/// re-read as the start of another one.
fn replace_sequences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'scan: while !rest.is_empty() {
        if rest.starts_with('\\') {
            for (pattern, replacement) in REPLACEMENTS {
                if let Some(tail) = rest.strip_prefix(pattern) {
                    out.push_str(replacement);
                    rest = tail;
                    continue 'scan;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
