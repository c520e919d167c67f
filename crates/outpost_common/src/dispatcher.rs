//! Output action dispatcher
//!
//! One pass over a response: resolve every declared output, show DISPLAY
//! outputs as they come, and defer work that must not happen before the
//! user has read what precedes it. A command is run immediately only when
//! no later output is displayed; otherwise it waits, together with every
//! file write, until the display pass is complete.
//!
//! Deferred work lives in a queue local to the pass, so nothing carries
//! over between calls.

use crate::config::DispatchConfig;
use crate::confirm::{
    confirm_and_run, CommandResult, CommandRunner, Confirmer, ShellRunner, TerminalConfirmer,
};
use crate::display::{DisplayFormatter, SECTION_SEPARATOR};
use crate::error::{OutpostError, Result};
use crate::extract::{ContentExtractor, ExtractionInput};
use crate::outputs::{OutputAction, OutputContent, OutputDefinition, OutputType, ResolvedOutput};
use crate::response::Response;
use crate::structured::StructuredDataExtractor;
use crate::writers::{FileWriterChain, WriteRequest};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Display text when nothing could be resolved
pub const NO_CONTENT: &str = "No content found in the response.";

/// Receives display chunks at the moment they are appended
pub trait DisplaySink {
    fn show(&self, chunk: &str);
}

/// Discards chunks; the caller reads `DispatchReport::display` instead
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn show(&self, _chunk: &str) {}
}

/// Terminal state of one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutputOutcome {
    Displayed,
    Written { path: PathBuf },
    Executed { success: bool, exit_code: Option<i32> },
    Declined,
    Skipped,
    Failed { reason: String },
}

/// Side effects in the order they happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DispatchEvent {
    Displayed(String),
    Executed(String),
    Written(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub display: String,
    pub created_files: Vec<PathBuf>,
    /// Per output, in declaration order
    pub outcomes: Vec<(String, OutputOutcome)>,
    pub warnings: Vec<String>,
    pub events: Vec<DispatchEvent>,
    /// Outputs whose content was found
    pub resolved: usize,
    /// The pass failed and `display` holds the raw response text
    pub fell_back: bool,
}

impl DispatchReport {
    fn fallback(text: &str) -> Self {
        let text = text.trim();
        Self {
            display: if text.is_empty() {
                NO_CONTENT.to_string()
            } else {
                text.to_string()
            },
            fell_back: true,
            ..Default::default()
        }
    }

    pub fn outcome(&self, name: &str) -> Option<&OutputOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// Names of outputs whose command actually ran
    pub fn executed(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DispatchEvent::Executed(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Work deferred until the display pass is complete
#[derive(Debug, Clone, Copy)]
enum PendingWork {
    Command(usize),
    Write(usize),
}

pub struct OutputActionDispatcher {
    config: DispatchConfig,
    writers: FileWriterChain,
    confirmer: Box<dyn Confirmer>,
    runner: Box<dyn CommandRunner>,
    sink: Box<dyn DisplaySink>,
}

impl OutputActionDispatcher {
    /// Interactive dispatcher: terminal prompt, host shell, no sink
    pub fn new(config: DispatchConfig) -> Self {
        let runner = ShellRunner::new(config.commands.clone());
        Self {
            config,
            writers: FileWriterChain::standard(),
            confirmer: Box::new(TerminalConfirmer),
            runner: Box::new(runner),
            sink: Box::new(NullSink),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Box<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn DisplaySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_writers(mut self, writers: FileWriterChain) -> Self {
        self.writers = writers;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one full pass. Never fails: an internal error yields the raw
    /// response text and no files.
    pub fn dispatch(&self, response: &Response, definitions: &[OutputDefinition]) -> DispatchReport {
        match self.try_dispatch(response, definitions) {
            Ok(report) => report,
            Err(e) => {
                warn!("Dispatch pass failed ({}), showing raw response", e);
                DispatchReport::fallback(&response.normalize().text)
            }
        }
    }

    /// Find content for every declared output without acting on any of it
    pub fn resolve(
        &self,
        response: &Response,
        definitions: &[OutputDefinition],
    ) -> Result<Vec<ResolvedOutput>> {
        check_unique(definitions)?;

        let normalized = response.normalize();
        let fields = StructuredDataExtractor::new()
            .with_interesting_keys(definitions.iter().map(|d| d.name.clone()))
            .extract(&normalized);

        let mut outputs: Vec<ResolvedOutput> =
            definitions.iter().cloned().map(ResolvedOutput::new).collect();

        for output in outputs.iter_mut() {
            if let Some(content) = self.find_content(&normalized.text, &fields, &output.definition) {
                output.resolve(content);
            }
        }

        // Never for commands: prose would go to the command prompt
        if self.config.sole_output_fallback
            && outputs.len() == 1
            && !outputs[0].is_resolved()
            && outputs[0].definition.action != OutputAction::Execute
        {
            let whole = normalized.text.trim().to_string();
            if outputs[0].resolve(OutputContent::Text(whole)) {
                debug!("Sole output '{}' takes the whole response", outputs[0].definition.name);
            }
        }

        for output in outputs.iter_mut() {
            output.fail();
        }
        Ok(outputs)
    }

    fn find_content(
        &self,
        text: &str,
        fields: &Map<String, Value>,
        definition: &OutputDefinition,
    ) -> Option<OutputContent> {
        let input = ExtractionInput {
            text,
            fields,
            output_name: &definition.name,
        };
        let found = ContentExtractor::for_type(definition.output_type)
            .extract(&input, self.config.unescape_ratio)?;

        if definition.output_type == OutputType::Json {
            if let Ok(value) = serde_json::from_str::<Value>(&found) {
                return Some(OutputContent::Structured(value));
            }
        }
        Some(OutputContent::Text(found))
    }

    fn try_dispatch(
        &self,
        response: &Response,
        definitions: &[OutputDefinition],
    ) -> Result<DispatchReport> {
        let outputs = self.resolve(response, definitions)?;

        let mut report = DispatchReport::default();
        let mut sections: Vec<String> = Vec::new();
        let mut outcomes: Vec<Option<OutputOutcome>> = vec![None; outputs.len()];
        let mut pending: Vec<PendingWork> = Vec::new();
        let mut formatter =
            DisplayFormatter::new(self.config.display_headings, self.config.unescape_ratio);

        for (index, output) in outputs.iter().enumerate() {
            let definition = &output.definition;
            let Some(content) = output.content() else {
                outcomes[index] = Some(if definition.required {
                    warn!("Required output '{}' not found in response", definition.name);
                    report
                        .warnings
                        .push(format!("Required output '{}' was not found.", definition.name));
                    OutputOutcome::Failed {
                        reason: "content not found".to_string(),
                    }
                } else {
                    OutputOutcome::Skipped
                });
                continue;
            };
            report.resolved += 1;

            match definition.action {
                OutputAction::Display => {
                    let chunk = formatter.format(definition, content);
                    self.show(&mut report, &mut sections, &definition.name, chunk);
                    outcomes[index] = Some(OutputOutcome::Displayed);
                }
                OutputAction::Execute => {
                    if displayed_later(&outputs, index) {
                        debug!("Command '{}' deferred until display completes", definition.name);
                        pending.push(PendingWork::Command(index));
                    } else {
                        let outcome =
                            self.execute(&mut report, &mut sections, &mut formatter, output, content);
                        outcomes[index] = Some(outcome);
                    }
                }
                OutputAction::Write => pending.push(PendingWork::Write(index)),
                OutputAction::None => outcomes[index] = Some(OutputOutcome::Skipped),
            }
        }

        // Commands first, then writes, each in declaration order
        for work in &pending {
            if let PendingWork::Command(index) = *work {
                let output = &outputs[index];
                if let Some(content) = output.content() {
                    let outcome =
                        self.execute(&mut report, &mut sections, &mut formatter, output, content);
                    outcomes[index] = Some(outcome);
                }
            }
        }

        let writes: Vec<usize> = pending
            .iter()
            .filter_map(|work| match *work {
                PendingWork::Write(index) => Some(index),
                PendingWork::Command(_) => None,
            })
            .collect();
        let stylesheet = self.sibling_path(&outputs, &writes, OutputType::Css);
        let script = self.sibling_path(&outputs, &writes, OutputType::Js);

        for index in writes {
            let output = &outputs[index];
            let Some(content) = output.content() else {
                continue;
            };
            let request = WriteRequest {
                definition: &output.definition,
                content,
                output_dir: &self.config.output_dir,
                site_root: self.config.is_site_root(&output.definition.name),
                stylesheet: stylesheet.as_deref(),
                script: script.as_deref(),
                unescape_ratio: self.config.unescape_ratio,
            };
            let outcome = match self.writers.write(&request) {
                Ok(path) => {
                    report
                        .events
                        .push(DispatchEvent::Written(output.definition.name.clone()));
                    report.created_files.push(path.clone());
                    OutputOutcome::Written { path }
                }
                Err(e) => {
                    warn!("Writing '{}' failed: {}", output.definition.name, e);
                    OutputOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes[index] = Some(outcome);
        }

        report.outcomes = outputs
            .iter()
            .zip(outcomes)
            .map(|(output, outcome)| {
                (
                    output.definition.name.clone(),
                    outcome.unwrap_or(OutputOutcome::Skipped),
                )
            })
            .collect();

        report.display = if report.resolved == 0 {
            NO_CONTENT.to_string()
        } else {
            let mut parts = sections;
            if !report.warnings.is_empty() {
                parts.push(report.warnings.join("\n"));
            }
            parts.join(SECTION_SEPARATOR)
        };

        info!(
            "Dispatch complete: {}/{} resolved, {} file(s) written",
            report.resolved,
            outputs.len(),
            report.created_files.len()
        );
        Ok(report)
    }

    fn show(&self, report: &mut DispatchReport, sections: &mut Vec<String>, name: &str, chunk: String) {
        self.sink.show(&chunk);
        sections.push(chunk);
        report.events.push(DispatchEvent::Displayed(name.to_string()));
    }

    fn execute(
        &self,
        report: &mut DispatchReport,
        sections: &mut Vec<String>,
        formatter: &mut DisplayFormatter,
        output: &ResolvedOutput,
        content: &OutputContent,
    ) -> OutputOutcome {
        let name = &output.definition.name;

        if !self.config.commands.enabled {
            info!("Command execution disabled, showing '{}' instead", name);
            let chunk = formatter.format(&output.definition, content);
            self.show(report, sections, name, chunk);
            return OutputOutcome::Skipped;
        }

        let command = content.as_text();
        match confirm_and_run(name, &command, self.confirmer.as_ref(), self.runner.as_ref()) {
            CommandResult::Executed(outcome) => {
                report.events.push(DispatchEvent::Executed(name.clone()));
                OutputOutcome::Executed {
                    success: outcome.success,
                    exit_code: outcome.exit_code,
                }
            }
            CommandResult::Declined => OutputOutcome::Declined,
            CommandResult::Failed(reason) => OutputOutcome::Failed { reason },
            CommandResult::Empty => OutputOutcome::Skipped,
        }
    }

    /// Relative path of the first queued write of `output_type`, with `/`
    /// separators for use in HTML references
    fn sibling_path(
        &self,
        outputs: &[ResolvedOutput],
        writes: &[usize],
        output_type: OutputType,
    ) -> Option<String> {
        writes
            .iter()
            .map(|&i| &outputs[i].definition)
            .find(|d| d.output_type == output_type)
            .and_then(|d| self.writers.relative_path(d, self.config.is_site_root(&d.name)))
            .map(|path| web_path(&path))
    }
}

/// Whether any output after `index` is displayed
fn displayed_later(outputs: &[ResolvedOutput], index: usize) -> bool {
    outputs[index + 1..]
        .iter()
        .any(|o| o.is_resolved() && o.definition.action == OutputAction::Display)
}

fn web_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn check_unique(definitions: &[OutputDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for definition in definitions {
        if !seen.insert(definition.name.as_str()) {
            return Err(OutpostError::DuplicateOutput(definition.name.clone()));
        }
    }
    Ok(())
}
