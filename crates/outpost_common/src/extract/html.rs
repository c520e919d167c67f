//! HTML extraction strategies

use super::fence::largest_fenced_checked;
use super::{field_text, ExtractionInput, Strategy};
use regex::Regex;
use std::sync::LazyLock;

static DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:<!doctype\s+html[^>]*>\s*)?<html[\s>].*?</html\s*>").unwrap()
});

static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>.*?</body\s*>").unwrap());

static STYLE_OR_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style[^>]*>.*?</style\s*>|<script[^>]*>.*?</script\s*>").unwrap()
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][a-zA-Z0-9-]*[\s>/]").unwrap());

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_html", 20, fenced_html),
        Strategy::new("html_document", 20, html_document),
        Strategy::new("body_region", 20, body_region),
        Strategy::new("style_script_regions", 20, style_script_regions),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(
        input.fields,
        input.output_name,
        &["html_content", "html", "html_code", "page"],
    )
}

fn fenced_html(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced_checked(input.text, &["html", "htm", "xhtml"], 20, |body| {
        ANY_TAG.is_match(body)
    })
    .map(String::from)
}

fn html_document(input: &ExtractionInput<'_>) -> Option<String> {
    DOCUMENT
        .find(input.text)
        .map(|m| m.as_str().trim().to_string())
}

fn body_region(input: &ExtractionInput<'_>) -> Option<String> {
    BODY.find(input.text).map(|m| m.as_str().trim().to_string())
}

fn style_script_regions(input: &ExtractionInput<'_>) -> Option<String> {
    let regions: Vec<&str> = STYLE_OR_SCRIPT
        .find_iter(input.text)
        .map(|m| m.as_str().trim())
        .collect();
    if regions.is_empty() {
        None
    } else {
        Some(regions.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ContentExtractor;
    use crate::outputs::OutputType;
    use serde_json::Map;

    fn run(text: &str) -> Option<String> {
        let fields = Map::new();
        let input = ExtractionInput {
            text,
            fields: &fields,
            output_name: "page_html",
        };
        ContentExtractor::for_type(OutputType::Html).extract(&input, 2.0)
    }

    #[test]
    fn test_fenced_html_exact_body() {
        let body = "<div class=\"hero\">\n  <h1>Welcome</h1>\n</div>";
        let text = format!("Here is the page:\n```html\n{}\n```\nEnjoy.", body);
        assert_eq!(run(&text), Some(body.to_string()));
    }

    #[test]
    fn test_untagged_fence_without_markup_skipped() {
        let text = "```\nthis is not markup at all, just words\n```";
        assert_eq!(run(text), None);
    }

    #[test]
    fn test_full_document_in_prose() {
        let text = "Sure!\n<!DOCTYPE html>\n<html><head></head><body><p>Hi</p></body></html>\nThanks";
        let found = run(text).unwrap();
        assert!(found.starts_with("<!DOCTYPE html>"));
        assert!(found.ends_with("</html>"));
    }

    #[test]
    fn test_body_region() {
        let text = "Fragment: <body class=\"x\"><main>Content goes here</main></body> end";
        assert_eq!(
            run(text),
            Some("<body class=\"x\"><main>Content goes here</main></body>".to_string())
        );
    }

    #[test]
    fn test_style_and_script_regions() {
        let text = "<style>p { color: red; }</style> and <script>console.log(1)</script>";
        let found = run(text).unwrap();
        assert!(found.contains("<style>"));
        assert!(found.contains("<script>"));
    }

    #[test]
    fn test_no_html_is_miss() {
        assert_eq!(run("plain prose only"), None);
    }
}
