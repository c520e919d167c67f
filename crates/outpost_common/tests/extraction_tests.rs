//! Tests for locating output content in assorted response shapes.

use outpost_common::extract::{ContentExtractor, ExtractionInput};
use outpost_common::outputs::{OutputAction, OutputContent, OutputDefinition, OutputType};
use outpost_common::response::Response;
use outpost_common::unescape::unescape;
use outpost_common::{DispatchConfig, OutputActionDispatcher};
use serde_json::{json, Map};

fn extract(output_type: OutputType, text: &str, name: &str) -> Option<String> {
    let fields = Map::new();
    let input = ExtractionInput {
        text,
        fields: &fields,
        output_name: name,
    };
    ContentExtractor::for_type(output_type).extract(&input, 2.0)
}

#[test]
fn test_tagged_fence_returned_exactly() {
    let cases = [
        (OutputType::Css, "css", ".card {\n  padding: 1rem;\n  border: 1px solid #ddd;\n}"),
        (OutputType::Html, "html", "<section>\n  <h2>Pricing</h2>\n</section>"),
        (OutputType::Json, "json", "{\"plan\": \"pro\", \"seats\": 5}"),
        (
            OutputType::Markdown,
            "markdown",
            "# Release notes\n\n- Faster startup\n- Smaller binary",
        ),
    ];
    for (output_type, lang, body) in cases {
        let text = format!("Sure, here it is:\n\n```{}\n{}\n```\n\nAnything else?", lang, body);
        assert_eq!(
            extract(output_type, &text, "unnamed"),
            Some(body.to_string()),
            "type {}",
            output_type
        );
    }
}

#[test]
fn test_larger_of_two_blocks_wins() {
    let text = "```css\na { color: red; }\n```\n\n```css\nbody {\n  margin: 0;\n  font-family: sans-serif;\n}\n```";
    assert_eq!(
        extract(OutputType::Css, text, "styles"),
        Some("body {\n  margin: 0;\n  font-family: sans-serif;\n}".to_string())
    );
}

#[test]
fn test_unescape_threshold() {
    let escaped = "line one\\nline two\\nline three\\nline four";
    assert_eq!(unescape(escaped), "line one\nline two\nline three\nline four");

    let mostly_literal = "a\nb\nc\nd\nkeep \\n here\ne";
    assert_eq!(unescape(mostly_literal), mostly_literal);
}

#[test]
fn test_chat_completion_envelope() {
    let response = Response::from_value(json!({
        "id": "chatcmpl-1",
        "model": "some-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "```json\n{\"summary\": \"Disk nearly full\", \"command\": \"du -sh /var/log\"}\n```"
            }
        }]
    }));
    let defs = vec![
        OutputDefinition::new("summary", OutputType::Text, OutputAction::Display),
        OutputDefinition::new("command", OutputType::Code, OutputAction::Execute),
    ];

    let resolved = OutputActionDispatcher::new(DispatchConfig::default())
        .resolve(&response, &defs)
        .unwrap();

    assert_eq!(
        resolved[0].content(),
        Some(&OutputContent::Text("Disk nearly full".to_string()))
    );
    assert_eq!(
        resolved[1].content(),
        Some(&OutputContent::Text("du -sh /var/log".to_string()))
    );
}

#[test]
fn test_escaped_json_inside_prose() {
    let text = r#"Result follows {\"results\": {\"explanation\": \"Restart nginx\", \"command\": \"systemctl restart nginx\"}} done"#;
    let defs = vec![
        OutputDefinition::new("explanation", OutputType::Markdown, OutputAction::Display),
        OutputDefinition::new("command", OutputType::Code, OutputAction::Execute),
    ];

    let resolved = OutputActionDispatcher::new(DispatchConfig::default())
        .resolve(&Response::parse(text), &defs)
        .unwrap();

    assert_eq!(resolved[0].content().unwrap().as_text(), "Restart nginx");
    assert_eq!(resolved[1].content().unwrap().as_text(), "systemctl restart nginx");
}

#[test]
fn test_json_output_resolved_as_structured_value() {
    let response = Response::parse(r#"{"results": {"report": {"ok": true, "checks": 3}}}"#);
    let defs = vec![OutputDefinition::new("report", OutputType::Json, OutputAction::Display)];

    let resolved = OutputActionDispatcher::new(DispatchConfig::default())
        .resolve(&response, &defs)
        .unwrap();

    assert_eq!(
        resolved[0].content(),
        Some(&OutputContent::Structured(json!({"ok": true, "checks": 3})))
    );
}

#[test]
fn test_markdown_section_from_plain_reply() {
    let text = "I looked at the logs.\n\n## Findings\n- nginx restarted twice\n- disk at 91%\n\n## Next Steps\n- rotate logs";
    assert_eq!(
        extract(OutputType::Markdown, text, "findings"),
        Some("- nginx restarted twice\n- disk at 91%".to_string())
    );
}

#[test]
fn test_stray_brace_in_prose_before_results() {
    let text = "In JS you open a block with { and then:\n{\"results\": {\"explanation\": \"Lists files\", \"command\": \"ls -la\"}}";
    let defs = vec![
        OutputDefinition::new("explanation", OutputType::Markdown, OutputAction::Display),
        OutputDefinition::new("command", OutputType::Code, OutputAction::Execute),
    ];

    let resolved = OutputActionDispatcher::new(DispatchConfig::default())
        .resolve(&Response::parse(text), &defs)
        .unwrap();

    assert_eq!(resolved[0].content().unwrap().as_text(), "Lists files");
    assert_eq!(resolved[1].content().unwrap().as_text(), "ls -la");
}

#[test]
fn test_tagged_fence_without_type_keywords() {
    let cases = [
        (OutputType::Js, "js", "alert(\"Hello from the page!\");"),
        (OutputType::Css, "css", "@import url(\"theme.css\");"),
    ];
    for (output_type, lang, body) in cases {
        let text = format!("Add this:\n\n```{}\n{}\n```\n", lang, body);
        assert_eq!(
            extract(output_type, &text, "unnamed"),
            Some(body.to_string()),
            "type {}",
            output_type
        );
    }
}
