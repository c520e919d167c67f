//! JSON extraction strategies

use super::fence::{largest_fenced_checked, parsed_spans};
use super::{field_text, ExtractionInput, Strategy};
use serde_json::Value;

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_json", 2, fenced_json),
        Strategy::new("balanced_json", 2, balanced_json),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(input.fields, input.output_name, &["json", "data", "json_data"])
}

fn fenced_json(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced_checked(input.text, &["json", "json5", "jsonc"], 2, |body| {
        let t = body.trim_start();
        t.starts_with('{') || t.starts_with('[')
    })
    .map(String::from)
}

/// Largest balanced object or array in the text that parses
fn balanced_json(input: &ExtractionInput<'_>) -> Option<String> {
    let parses = |span: &str| serde_json::from_str::<Value>(span).ok().map(|_| ());
    let mut best: Option<&str> = None;
    let spans = parsed_spans(input.text, '{', '}', &parses)
        .into_iter()
        .chain(parsed_spans(input.text, '[', ']', &parses));

    for (span, _) in spans {
        if best.map(|b| span.len() > b.len()).unwrap_or(true) {
            best = Some(span);
        }
    }

    best.map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ContentExtractor;
    use crate::outputs::OutputType;
    use serde_json::{json, Map};

    fn run_with(text: &str, fields: &Map<String, Value>) -> Option<String> {
        let input = ExtractionInput {
            text,
            fields,
            output_name: "report",
        };
        ContentExtractor::for_type(OutputType::Json).extract(&input, 2.0)
    }

    #[test]
    fn test_structured_value_pretty_printed() {
        let fields = match json!({"report": {"ok": true}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(
            run_with("", &fields),
            Some("{\n  \"ok\": true\n}".to_string())
        );
    }

    #[test]
    fn test_fenced_json_body() {
        let text = "```json\n[1, 2, 3]\n```";
        assert_eq!(run_with(text, &Map::new()), Some("[1, 2, 3]".to_string()));
    }

    #[test]
    fn test_largest_parsable_span() {
        let text = r#"small {"a": 1} large {"a": 1, "b": [1, 2]} broken {"c": }"#;
        assert_eq!(
            run_with(text, &Map::new()),
            Some(r#"{"a": 1, "b": [1, 2]}"#.to_string())
        );
    }

    #[test]
    fn test_no_json_is_miss() {
        assert_eq!(run_with("nothing here", &Map::new()), None);
    }

    #[test]
    fn test_stray_brace_before_object() {
        let text = r#"Blocks start with { in most languages. Result: {"ok": true}"#;
        assert_eq!(
            run_with(text, &Map::new()),
            Some(r#"{"ok": true}"#.to_string())
        );
    }
}
