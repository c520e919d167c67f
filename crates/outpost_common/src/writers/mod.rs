//! File writer chain
//!
//! Writers are tried in a fixed order; the first one that handles the
//! output's type renders and persists it. Type-specific writers come first,
//! the plain text writer last so every type has a home.

pub mod html;

pub use html::HtmlWriter;

use crate::error::{OutpostError, Result};
use crate::outputs::{OutputContent, OutputDefinition, OutputType};
use crate::unescape::unescape_with_ratio;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Everything a writer needs for one output
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub definition: &'a OutputDefinition,
    pub content: &'a OutputContent,
    pub output_dir: &'a Path,
    /// HTML named for the site root is written as `index.html`
    pub site_root: bool,
    /// Relative path of a stylesheet written in the same pass
    pub stylesheet: Option<&'a str>,
    /// Relative path of a script written in the same pass
    pub script: Option<&'a str>,
    pub unescape_ratio: f64,
}

impl WriteRequest<'_> {
    /// Content as text, unescaped
    pub fn text(&self) -> String {
        unescape_with_ratio(&self.content.as_text(), self.unescape_ratio)
    }
}

pub trait FileWriter {
    fn name(&self) -> &'static str;

    fn handles(&self, output_type: OutputType) -> bool;

    /// Subdirectory under the output directory, if the type has one
    fn subdir(&self) -> Option<&'static str> {
        None
    }

    /// Final file contents
    fn render(&self, request: &WriteRequest<'_>) -> String;

    /// Path relative to the output directory
    fn relative_path(&self, definition: &OutputDefinition, site_root: bool) -> PathBuf {
        let file = safe_relative(&definition.file_name(site_root));
        match self.subdir() {
            Some(dir) if !file.starts_with(dir) => Path::new(dir).join(file),
            _ => file,
        }
    }

    /// Render and persist; parent directories are created on demand
    fn write(&self, request: &WriteRequest<'_>) -> Result<PathBuf> {
        let path = request
            .output_dir
            .join(self.relative_path(request.definition, request.site_root));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OutpostError::Write {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        fs::write(&path, self.render(request)).map_err(|e| OutpostError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

        info!(
            "{} wrote '{}' to {}",
            self.name(),
            request.definition.name,
            path.display()
        );
        Ok(fs::canonicalize(&path).unwrap_or(path))
    }
}

/// Keep only normal components so a filename cannot escape the output directory
fn safe_relative(file: &str) -> PathBuf {
    let cleaned: PathBuf = Path::new(file)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from("output.txt")
    } else {
        cleaned
    }
}

/// Stylesheets go under `css/`
#[derive(Debug, Default)]
pub struct StylesheetWriter;

impl FileWriter for StylesheetWriter {
    fn name(&self) -> &'static str {
        "stylesheet"
    }

    fn handles(&self, output_type: OutputType) -> bool {
        output_type == OutputType::Css
    }

    fn subdir(&self) -> Option<&'static str> {
        Some("css")
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        request.text()
    }
}

/// Scripts go under `js/`
#[derive(Debug, Default)]
pub struct ScriptWriter;

impl FileWriter for ScriptWriter {
    fn name(&self) -> &'static str {
        "script"
    }

    fn handles(&self, output_type: OutputType) -> bool {
        output_type == OutputType::Js
    }

    fn subdir(&self) -> Option<&'static str> {
        Some("js")
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        request.text()
    }
}

/// Structured values are pretty-printed; strings are written as-is
#[derive(Debug, Default)]
pub struct JsonWriter;

impl FileWriter for JsonWriter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn handles(&self, output_type: OutputType) -> bool {
        output_type == OutputType::Json
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        match request.content {
            OutputContent::Structured(value) if !matches!(value, Value::String(_)) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            _ => request.text(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MarkdownWriter;

impl FileWriter for MarkdownWriter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn handles(&self, output_type: OutputType) -> bool {
        output_type == OutputType::Markdown
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        request.text()
    }
}

/// Universal fallback
#[derive(Debug, Default)]
pub struct TextWriter;

impl FileWriter for TextWriter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn handles(&self, _output_type: OutputType) -> bool {
        true
    }

    fn render(&self, request: &WriteRequest<'_>) -> String {
        request.text()
    }
}

pub struct FileWriterChain {
    writers: Vec<Box<dyn FileWriter>>,
}

impl Default for FileWriterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl FileWriterChain {
    /// HTML, CSS, JS, JSON, Markdown, then plain text
    pub fn standard() -> Self {
        Self {
            writers: vec![
                Box::new(HtmlWriter),
                Box::new(StylesheetWriter),
                Box::new(ScriptWriter),
                Box::new(JsonWriter),
                Box::new(MarkdownWriter),
                Box::new(TextWriter),
            ],
        }
    }

    /// Chain with a custom writer tried before the standard ones
    pub fn with_writer(mut self, writer: Box<dyn FileWriter>) -> Self {
        self.writers.insert(0, writer);
        self
    }

    pub fn writer_for(&self, output_type: OutputType) -> Option<&dyn FileWriter> {
        self.writers
            .iter()
            .find(|w| w.handles(output_type))
            .map(|w| w.as_ref())
    }

    /// Where `definition` would land, relative to the output directory
    pub fn relative_path(&self, definition: &OutputDefinition, site_root: bool) -> Option<PathBuf> {
        self.writer_for(definition.output_type)
            .map(|w| w.relative_path(definition, site_root))
    }

    pub fn write(&self, request: &WriteRequest<'_>) -> Result<PathBuf> {
        let writer = self.writer_for(request.definition.output_type).ok_or_else(|| {
            OutpostError::Internal(format!(
                "no writer for type {}",
                request.definition.output_type
            ))
        })?;
        writer.write(request)
    }
}
