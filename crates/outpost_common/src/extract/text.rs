//! Generic text extraction strategies (text, table, list, code)

use super::fence::largest_fenced_any;
use super::markdown::{heading_key, section_for};
use super::{field_text, ExtractionInput, Strategy};

pub(crate) fn strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("named_section", 1, named_section),
        Strategy::new("labeled_line", 1, labeled_line),
    ]
}

/// Code outputs also accept the largest fenced block of any language
pub(crate) fn code_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("structured_field", 1, structured_field),
        Strategy::new("fenced_any", 1, fenced_any),
        Strategy::new("named_section", 1, named_section),
        Strategy::new("labeled_line", 1, labeled_line),
    ]
}

fn structured_field(input: &ExtractionInput<'_>) -> Option<String> {
    field_text(input.fields, input.output_name, &[])
}

fn fenced_any(input: &ExtractionInput<'_>) -> Option<String> {
    largest_fenced_any(input.text, 1).map(String::from)
}

fn named_section(input: &ExtractionInput<'_>) -> Option<String> {
    section_for(input.text, input.output_name)
}

/// `Name: value` on a single line, tolerating bold/italic markers around
/// the label.
fn labeled_line(input: &ExtractionInput<'_>) -> Option<String> {
    let wanted = heading_key(input.output_name);
    if wanted.is_empty() {
        return None;
    }

    input.text.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        if heading_key(label) != wanted {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '*' || c == '_').trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ContentExtractor;
    use crate::outputs::OutputType;
    use serde_json::{json, Map, Value};

    fn run(output_type: OutputType, text: &str, name: &str) -> Option<String> {
        let fields = Map::new();
        let input = ExtractionInput {
            text,
            fields: &fields,
            output_name: name,
        };
        ContentExtractor::for_type(output_type).extract(&input, 2.0)
    }

    #[test]
    fn test_string_list_field_joined() {
        let fields = match json!({"steps": ["one", "two"]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let input = ExtractionInput {
            text: "",
            fields: &fields,
            output_name: "steps",
        };
        let found = ContentExtractor::for_type(OutputType::List).extract(&input, 2.0);
        assert_eq!(found, Some("one\ntwo".to_string()));
    }

    #[test]
    fn test_labeled_line() {
        let text = "**Summary**: the build is green\nOther: x";
        assert_eq!(
            run(OutputType::Text, text, "summary"),
            Some("the build is green".to_string())
        );
    }

    #[test]
    fn test_code_takes_fenced_block() {
        let text = "Explanation first.\n```bash\nls -la /tmp\n```";
        assert_eq!(
            run(OutputType::Code, text, "command"),
            Some("ls -la /tmp".to_string())
        );
    }

    #[test]
    fn test_text_ignores_fences() {
        let text = "```bash\nls -la /tmp\n```";
        assert_eq!(run(OutputType::Text, text, "command"), None);
    }

    #[test]
    fn test_section_for_text() {
        let text = "## Summary\nAll good.\n## Details\nMore.";
        assert_eq!(
            run(OutputType::Text, text, "summary"),
            Some("All good.".to_string())
        );
    }
}
