//! Response normalization
//!
//! AI responses arrive as plain text or as one of several JSON envelope
//! shapes. Everything downstream works on a `NormalizedResponse`: the
//! assistant's message as text, plus the structured mapping when there was one.

use serde_json::{Map, Value};

/// Raw response as handed over by the AI client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Text(String),
    Envelope(Map<String, Value>),
}

/// Canonical text plus the original structured form, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedResponse {
    pub text: String,
    pub structured: Option<Map<String, Value>>,
}

impl Response {
    /// Classify a raw payload: a JSON object becomes an envelope, a JSON
    /// string is unwrapped, anything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('"') {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(map)) => return Response::Envelope(map),
                Ok(Value::String(s)) => return Response::Text(s),
                _ => {}
            }
        }
        Response::Text(raw.to_string())
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Response::Envelope(map),
            Value::String(s) => Response::Text(s),
            other => Response::Text(other.to_string()),
        }
    }

    /// Produce the canonical text and keep the envelope alongside it
    pub fn normalize(&self) -> NormalizedResponse {
        match self {
            Response::Text(text) => NormalizedResponse {
                text: text.clone(),
                structured: None,
            },
            Response::Envelope(map) => NormalizedResponse {
                text: envelope_text(map),
                structured: Some(map.clone()),
            },
        }
    }
}

impl From<&str> for Response {
    fn from(raw: &str) -> Self {
        Response::Text(raw.to_string())
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Response::from_value(value)
    }
}

/// Pick the assistant message out of an envelope.
///
/// Preference: `content`, `text`, `message` (string or `{content}`), then the
/// first `choices[i].message.content` or `choices[i].text`. Falls back to the
/// serialized mapping.
fn envelope_text(map: &Map<String, Value>) -> String {
    for key in ["content", "text"] {
        if let Some(text) = map.get(key).and_then(value_text) {
            return text;
        }
    }

    if let Some(message) = map.get("message") {
        let text = match message {
            Value::Object(inner) => inner.get("content").and_then(value_text),
            other => value_text(other),
        };
        if let Some(text) = text {
            return text;
        }
    }

    if let Some(Value::Array(choices)) = map.get("choices") {
        for choice in choices {
            let content = choice
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(value_text)
                .or_else(|| choice.get("text").and_then(value_text));
            if let Some(text) = content {
                return text;
            }
        }
    }

    serde_json::to_string_pretty(map).unwrap_or_else(|_| format!("{:?}", map))
}

/// Text for a message-bearing value. Arrays of content parts are joined.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("text").and_then(|t| t.as_str()).map(String::from),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            if joined.trim().is_empty() {
                None
            } else {
                Some(joined)
            }
        }
        Value::Object(_) => serde_json::to_string_pretty(value).ok(),
        _ => None,
    }
}
