//! Output definitions and per-pass resolution state.
//!
//! `OutputSpec` is the loose shape a pattern author writes. `OutputSpec::resolve`
//! is the one place where action/type inference happens; everything downstream
//! works on the fully resolved `OutputDefinition`.

use crate::error::{OutpostError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use tracing::warn;

/// Content type of a declared output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Text,
    Json,
    Html,
    Css,
    Js,
    Markdown,
    Code,
    Table,
    List,
}

impl OutputType {
    pub fn parse(raw: &str) -> Option<Self> {
        let t = match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" | "string" | "plain" => OutputType::Text,
            "json" => OutputType::Json,
            "html" | "htm" => OutputType::Html,
            "css" | "stylesheet" => OutputType::Css,
            "js" | "javascript" | "script" => OutputType::Js,
            "markdown" | "md" => OutputType::Markdown,
            "code" | "bash" | "shell" | "sh" | "command" => OutputType::Code,
            "table" => OutputType::Table,
            "list" => OutputType::List,
            _ => return None,
        };
        Some(t)
    }

    /// File extension used when a WRITE output has no explicit filename
    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Html => "html",
            OutputType::Css => "css",
            OutputType::Js => "js",
            OutputType::Json => "json",
            OutputType::Markdown => "md",
            OutputType::Text | OutputType::Code | OutputType::Table | OutputType::List => "txt",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputType::Text => "text",
            OutputType::Json => "json",
            OutputType::Html => "html",
            OutputType::Css => "css",
            OutputType::Js => "js",
            OutputType::Markdown => "markdown",
            OutputType::Code => "code",
            OutputType::Table => "table",
            OutputType::List => "list",
        };
        write!(f, "{}", s)
    }
}

/// What to do with an output once its content is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputAction {
    Display,
    Write,
    Execute,
    None,
}

impl OutputAction {
    pub fn parse(raw: &str) -> Option<Self> {
        let a = match raw.trim().to_ascii_lowercase().as_str() {
            "display" | "show" | "print" => OutputAction::Display,
            "write" | "save" | "file" => OutputAction::Write,
            "execute" | "exec" | "run" => OutputAction::Execute,
            "none" | "ignore" | "" => OutputAction::None,
            _ => return None,
        };
        Some(a)
    }
}

/// Loosely-typed output record as written by a pattern author
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type", alias = "output_type")]
    pub output_type: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub write_to_file: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    /// Legacy flag: `auto_run: true` on a code output means execute
    #[serde(default)]
    pub auto_run: Option<bool>,
}

/// Fully resolved, immutable output definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDefinition {
    pub name: String,
    pub description: String,
    pub output_type: OutputType,
    pub required: bool,
    pub action: OutputAction,
    pub write_to_file: Option<String>,
    pub group: Option<String>,
    pub example: Option<String>,
}

impl OutputSpec {
    /// Resolve type and action into concrete enums.
    ///
    /// Action precedence: explicit `action`, then `auto_run` on a code output,
    /// then `write_to_file`, then display.
    pub fn resolve(self) -> Result<OutputDefinition> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(OutpostError::InvalidDefinition(
                "output name must not be empty".to_string(),
            ));
        }

        let output_type = match self.output_type.as_deref() {
            None => OutputType::Text,
            Some(raw) => OutputType::parse(raw).ok_or_else(|| {
                OutpostError::InvalidDefinition(format!("unknown type '{}' for '{}'", raw, name))
            })?,
        };

        let explicit = match self.action.as_deref() {
            None => None,
            Some(raw) => Some(OutputAction::parse(raw).ok_or_else(|| {
                OutpostError::InvalidDefinition(format!("unknown action '{}' for '{}'", raw, name))
            })?),
        };

        let auto_run = self.auto_run.unwrap_or(false) && output_type == OutputType::Code;
        let write_to_file = self
            .write_to_file
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());

        let action = match explicit {
            Some(action) => {
                if auto_run && action != OutputAction::Execute {
                    warn!(
                        "Output '{}' sets auto_run but declares action {:?}; keeping {:?}",
                        name, action, action
                    );
                }
                action
            }
            None if auto_run => OutputAction::Execute,
            None if write_to_file.is_some() => OutputAction::Write,
            None => OutputAction::Display,
        };

        Ok(OutputDefinition {
            description: self.description.unwrap_or_default(),
            output_type,
            required: self.required.unwrap_or(true),
            action,
            write_to_file,
            group: self.group.filter(|g| !g.trim().is_empty()),
            example: self.example,
            name,
        })
    }
}

impl OutputDefinition {
    /// Minimal constructor for callers that build definitions in code
    pub fn new(name: impl Into<String>, output_type: OutputType, action: OutputAction) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            output_type,
            required: true,
            action,
            write_to_file: None,
            group: None,
            example: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.write_to_file = Some(file.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Filename for a WRITE output: explicit `write_to_file`, or derived from
    /// the name and type. `site_root` selects `index.html` for HTML.
    pub fn file_name(&self, site_root: bool) -> String {
        if let Some(file) = &self.write_to_file {
            return file.clone();
        }
        if self.output_type == OutputType::Html && site_root {
            return "index.html".to_string();
        }
        format!("{}.{}", self.name, self.output_type.extension())
    }

    /// Human title derived from the name (`css_styles` → `Css Styles`)
    pub fn title(&self) -> String {
        self.name
            .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse output specs from YAML: either a bare list or `{ outputs: [...] }`
pub fn load_output_specs(yaml: &str) -> Result<Vec<OutputSpec>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Document {
        List(Vec<OutputSpec>),
        Wrapped { outputs: Vec<OutputSpec> },
    }

    let doc: Document = serde_yaml::from_str(yaml)?;
    Ok(match doc {
        Document::List(specs) => specs,
        Document::Wrapped { outputs } => outputs,
    })
}

/// Parse and resolve definitions in one step
pub fn load_output_definitions(yaml: &str) -> Result<Vec<OutputDefinition>> {
    load_output_specs(yaml)?
        .into_iter()
        .map(OutputSpec::resolve)
        .collect()
}

/// Resolved content: plain text or a structured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputContent {
    Text(String),
    Structured(Value),
}

impl OutputContent {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            OutputContent::Text(s) => Cow::Borrowed(s.as_str()),
            OutputContent::Structured(Value::String(s)) => Cow::Borrowed(s.as_str()),
            OutputContent::Structured(v) => {
                Cow::Owned(serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()))
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }
}

/// Resolution status of one output within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    Unresolved,
    Resolved,
    Failed,
}

/// A definition paired with the content found for it during one pass.
///
/// Content is set at most once; later `resolve` calls are ignored.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    pub definition: OutputDefinition,
    content: Option<OutputContent>,
    status: ResolutionStatus,
}

impl ResolvedOutput {
    pub fn new(definition: OutputDefinition) -> Self {
        Self {
            definition,
            content: None,
            status: ResolutionStatus::Unresolved,
        }
    }

    /// Set content if still unresolved. Returns whether it was accepted.
    pub fn resolve(&mut self, content: OutputContent) -> bool {
        if self.status != ResolutionStatus::Unresolved || content.is_blank() {
            return false;
        }
        self.content = Some(content);
        self.status = ResolutionStatus::Resolved;
        true
    }

    /// Mark as failed if no content was found
    pub fn fail(&mut self) {
        if self.status == ResolutionStatus::Unresolved {
            self.status = ResolutionStatus::Failed;
        }
    }

    pub fn content(&self) -> Option<&OutputContent> {
        self.content.as_ref()
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}
