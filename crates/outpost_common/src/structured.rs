//! Structured data extraction
//!
//! Locates a mapping of output-name → value inside a normalized response.
//! Sources, in priority order:
//! 1. a `results` sub-mapping of a structured response
//! 2. the structured response's own keys, minus envelope keys, when one
//!    of them names an output (otherwise they are the last resort)
//! 3. a fenced `json` block in the text, reduced by 1-2
//! 4. balanced `{...}` spans scanned from the text

use crate::extract::fence::{fenced_blocks, parsed_spans};
use crate::response::NormalizedResponse;
use serde_json::{Map, Value};
use tracing::debug;

/// Keys that belong to API envelopes rather than to declared outputs
pub const ENVELOPE_KEYS: &[&str] = &[
    "content",
    "choices",
    "message",
    "model",
    "id",
    "object",
    "finish_reason",
    "created",
    "usage",
    "system_fingerprint",
    "stop_reason",
    "stop_sequence",
    "logprobs",
    "done",
    "total_duration",
    "eval_count",
    "prompt_eval_count",
];

/// Keys starting with this prefix are internal bookkeeping
pub const INTERNAL_PREFIX: char = '_';

/// A scanned mapping with one of these keys is taken as the results mapping
pub const INTERESTING_KEYS: &[&str] = &["command", "explanation", "output"];

#[derive(Debug, Clone, Default)]
pub struct StructuredDataExtractor {
    extra_keys: Vec<String>,
}

impl StructuredDataExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept scanned mappings that carry one of these keys
    /// (typically the declared output names).
    pub fn with_interesting_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Candidate fields for the declared outputs; empty when nothing is found
    pub fn extract(&self, response: &NormalizedResponse) -> Map<String, Value> {
        // Leftover keys that name no output yield to the text sources
        let mut leftover = Map::new();
        if let Some(map) = &response.structured {
            let reduced = reduce(map);
            if results_of(map).is_some() || self.is_interesting(&reduced) {
                debug!("Structured fields taken from response envelope");
                return reduced;
            }
            leftover = reduced;
        }

        if let Some(found) = from_fenced(&response.text) {
            debug!("Structured fields taken from fenced json block");
            return found;
        }

        if let Some(found) = self.from_scan(&response.text) {
            debug!("Structured fields taken from scanned text");
            return found;
        }

        // Partially escaped payloads: retry with quotes restored
        if response.text.contains("\\\"") {
            let restored = response.text.replace("\\\"", "\"");
            if let Some(found) = self.from_scan(&restored) {
                debug!("Structured fields taken from unescaped scan");
                return found;
            }
        }

        leftover
    }

    fn from_scan(&self, text: &str) -> Option<Map<String, Value>> {
        let candidates: Vec<Map<String, Value>> = parsed_spans(text, '{', '}', &|span: &str| {
            match serde_json::from_str::<Value>(span) {
                Ok(Value::Object(map)) if !map.is_empty() => Some(map),
                _ => None,
            }
        })
        .into_iter()
        .map(|(_, map)| map)
        .collect();

        if let Some(results) = candidates.iter().find_map(results_of) {
            return Some(results);
        }

        candidates
            .into_iter()
            .find(|map| self.is_interesting(map))
    }

    fn is_interesting(&self, map: &Map<String, Value>) -> bool {
        map.keys().any(|key| {
            INTERESTING_KEYS.contains(&key.as_str()) || self.extra_keys.iter().any(|k| k == key)
        })
    }
}

/// Rules 1-2: a non-empty `results` mapping, otherwise the non-envelope keys
pub fn reduce(map: &Map<String, Value>) -> Map<String, Value> {
    if let Some(results) = results_of(map) {
        return results;
    }

    map.iter()
        .filter(|(key, _)| {
            !ENVELOPE_KEYS.contains(&key.as_str()) && !key.starts_with(INTERNAL_PREFIX)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `results` as a mapping, or as a string holding a serialized mapping
fn results_of(map: &Map<String, Value>) -> Option<Map<String, Value>> {
    match map.get("results")? {
        Value::Object(results) if !results.is_empty() => Some(results.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(results)) if !results.is_empty() => Some(results),
            _ => None,
        },
        _ => None,
    }
}

fn from_fenced(text: &str) -> Option<Map<String, Value>> {
    fenced_blocks(text)
        .into_iter()
        .filter(|block| block.lang == "json" || (block.lang.is_empty() && block.body.trim_start().starts_with('{')))
        .find_map(|block| match serde_json::from_str::<Value>(block.body.trim()) {
            Ok(Value::Object(map)) => Some(reduce(&map)).filter(|m| !m.is_empty()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use serde_json::json;

    fn extract(response: Response) -> Map<String, Value> {
        StructuredDataExtractor::new().extract(&response.normalize())
    }

    #[test]
    fn test_direct_results_mapping() {
        let found = extract(Response::from_value(json!({
            "results": {"summary": "ok"},
            "model": "m"
        })));
        assert_eq!(found.get("summary"), Some(&json!("ok")));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_envelope_keys_filtered() {
        let found = extract(Response::from_value(json!({
            "id": "abc",
            "model": "m",
            "usage": {},
            "_trace": "x",
            "summary": "kept"
        })));
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("summary"));
    }

    #[test]
    fn test_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"results\": {\"html\": \"<p>x</p>\"}}\n```\n";
        let found = extract(Response::parse(text));
        assert_eq!(found.get("html"), Some(&json!("<p>x</p>")));
    }

    #[test]
    fn test_envelope_content_with_fenced_json() {
        let found = extract(Response::from_value(json!({
            "content": "```json\n{\"summary\": \"inside\"}\n```",
            "model": "m"
        })));
        assert_eq!(found.get("summary"), Some(&json!("inside")));
    }

    #[test]
    fn test_scan_prefers_results_span() {
        let text = r#"noise {"note": 1} then {"results": {"command": "ls"}} tail"#;
        let found = extract(Response::parse(text));
        assert_eq!(found.get("command"), Some(&json!("ls")));
    }

    #[test]
    fn test_scan_accepts_interesting_keys() {
        let text = r#"Sure! {"explanation": "lists files", "command": "ls -la"} Done."#;
        let found = extract(Response::parse(text));
        assert_eq!(found.get("command"), Some(&json!("ls -la")));
    }

    #[test]
    fn test_scan_ignores_uninteresting_mapping() {
        let text = r#"config {"port": 80}"#;
        assert!(extract(Response::parse(text)).is_empty());
    }

    #[test]
    fn test_declared_names_make_mapping_interesting() {
        let text = r#"config {"port": 80}"#;
        let found = StructuredDataExtractor::new()
            .with_interesting_keys(["port"])
            .extract(&Response::parse(text).normalize());
        assert_eq!(found.get("port"), Some(&json!(80)));
    }

    #[test]
    fn test_malformed_candidates_skipped() {
        let text = r#"{broken: } and {"output": "fine"}"#;
        let found = extract(Response::parse(text));
        assert_eq!(found.get("output"), Some(&json!("fine")));
    }

    #[test]
    fn test_escaped_quotes_retry() {
        let text = r#"payload: {\"results\": {\"command\": \"pwd\"}}"#;
        let found = extract(Response::parse(text));
        assert_eq!(found.get("command"), Some(&json!("pwd")));
    }

    #[test]
    fn test_stray_brace_in_prose_before_object() {
        let text = "In JS you open a block with { and then:\n{\"results\": {\"command\": \"ls -la\"}}";
        let found = extract(Response::parse(text));
        assert_eq!(found.get("command"), Some(&json!("ls -la")));
    }

    #[test]
    fn test_field_named_like_chat_keys_kept() {
        let found = StructuredDataExtractor::new()
            .with_interesting_keys(["type", "index"])
            .extract(
                &Response::from_value(json!({"type": "report", "index": "a, b", "model": "m"}))
                    .normalize(),
            );
        assert_eq!(found.get("type"), Some(&json!("report")));
        assert_eq!(found.get("index"), Some(&json!("a, b")));
        assert!(!found.contains_key("model"));
    }

    #[test]
    fn test_message_envelope_yields_to_fenced_json() {
        let found = extract(Response::from_value(json!({
            "type": "message",
            "role": "assistant",
            "content": "```json\n{\"summary\": \"inside\"}\n```",
            "model": "m"
        })));
        assert_eq!(found.get("summary"), Some(&json!("inside")));
        assert!(!found.contains_key("role"));
    }

    #[test]
    fn test_nothing_found_is_empty() {
        assert!(extract(Response::parse("")).is_empty());
        assert!(extract(Response::parse("just words")).is_empty());
    }
}
