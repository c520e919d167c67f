//! HTML writer: completes fragments into documents, links sibling assets,
//! and normalizes indentation.

use super::{FileWriter, WriteRequest};
use crate::outputs::OutputType;
use regex::Regex;
use std::sync::LazyLock;

const INDENT: &str = "  ";

/// Elements that open an indentation level
const BLOCK_TAGS: &[&str] = &[
    "html", "head", "body", "header", "footer", "main", "nav", "section", "article", "aside",
    "div", "ul", "ol", "li", "table", "thead", "tbody", "tfoot", "tr", "form", "fieldset",
    "figure", "blockquote", "details", "select", "dl", "style", "script", "pre", "textarea",
];

/// Elements whose bodies are left untouched
const RAW_TAGS: &[&str] = &["script", "style", "pre", "textarea"];

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*?(/?)>").unwrap());

#[derive(Debug, Default)]
pub struct HtmlWriter;

impl FileWriter for HtmlWriter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn handles(&self, output_type: OutputType) -> bool {
        output_type == OutputType::Html
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        let text = request.text();
        let body = strip_fence_markers(&text);

        let title = if request.definition.description.trim().is_empty() {
            request.definition.title()
        } else {
            request.definition.description.trim().to_string()
        };

        let mut doc = if contains_ci(body, "<html") {
            body.to_string()
        } else {
            wrap_document(body, &title)
        };

        if let Some(href) = request.stylesheet {
            let tag = format!("<link rel=\"stylesheet\" href=\"{}\">", href);
            doc = inject_reference(&doc, &tag, href);
        }
        if let Some(src) = request.script {
            let tag = format!("<script src=\"{}\"></script>", src);
            doc = inject_reference(&doc, &tag, src);
        }

        reindent(&doc)
    }
}

/// Drop a leading ```html line and a trailing ``` line if present
fn strip_fence_markers(text: &str) -> &str {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    }
    body.trim_end().trim_end_matches("```").trim()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

/// ASCII lowercasing keeps byte offsets stable
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn escape_text(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn wrap_document(fragment: &str, title: &str) -> String {
    let mut doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n");
    if !contains_ci(fragment, "<head") {
        doc.push_str("<head>\n");
        doc.push_str("<meta charset=\"UTF-8\">\n");
        doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        doc.push_str(&format!("<title>{}</title>\n", escape_text(title)));
        doc.push_str("</head>\n");
    }
    if contains_ci(fragment, "<body") {
        doc.push_str(fragment);
        doc.push('\n');
    } else {
        doc.push_str("<body>\n");
        doc.push_str(fragment);
        doc.push_str("\n</body>\n");
    }
    doc.push_str("</html>\n");
    doc
}

/// Insert `tag` into the head, else before `</body>`, else at the end.
/// Nothing happens when `reference` already appears in the document.
fn inject_reference(doc: &str, tag: &str, reference: &str) -> String {
    if doc.contains(reference) {
        return doc.to_string();
    }
    let at = find_ci(doc, "</head>").or_else(|| find_ci(doc, "</body>"));
    match at {
        Some(i) => format!("{}{}\n{}", &doc[..i], tag, &doc[i..]),
        None => format!("{}\n{}\n", doc.trim_end(), tag),
    }
}

/// (opens, closes, starts with a closing tag) for block elements on a line
fn tag_balance(line: &str) -> (usize, usize, bool) {
    let mut opens = 0;
    let mut closes = 0;
    let mut leading_close = false;

    for caps in TAG.captures_iter(line) {
        let name = caps[2].to_ascii_lowercase();
        if !BLOCK_TAGS.contains(&name.as_str()) {
            continue;
        }
        if &caps[1] == "/" {
            if closes == 0 && opens == 0 && caps.get(0).map(|m| m.start()) == Some(0) {
                leading_close = true;
            }
            closes += 1;
        } else if &caps[3] != "/" {
            opens += 1;
        }
    }

    (opens, closes, leading_close)
}

/// Closing tag awaited if the line leaves a raw element open
fn raw_opened(line: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    RAW_TAGS.iter().find_map(|tag| {
        let open = lower.rfind(&format!("<{}", tag))?;
        let close = lower.rfind(&format!("</{}", tag));
        match close {
            Some(c) if c > open => None,
            _ => Some(format!("</{}", tag)),
        }
    })
}

/// Re-indent lines by block-element depth. Bodies of script, style, pre
/// and textarea are kept verbatim.
pub(crate) fn reindent(html: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut raw: Option<String> = None;

    for line in html.lines() {
        let trimmed = line.trim();

        if let Some(close) = raw.as_deref() {
            if !trimmed.to_ascii_lowercase().contains(close) {
                out.push(line.to_string());
                continue;
            }
        }

        if trimmed.is_empty() {
            if out.last().map(|l| !l.is_empty()).unwrap_or(false) {
                out.push(String::new());
            }
            continue;
        }

        let (opens, mut closes, leading_close) = tag_balance(trimmed);
        if leading_close {
            depth = depth.saturating_sub(1);
            closes -= 1;
        }
        out.push(format!("{}{}", INDENT.repeat(depth), trimmed));
        depth = (depth + opens).saturating_sub(closes);
        raw = raw_opened(trimmed);
    }

    while out.last().map(|l| l.is_empty()).unwrap_or(false) {
        out.pop();
    }
    let mut doc = out.join("\n");
    doc.push('\n');
    doc
}
