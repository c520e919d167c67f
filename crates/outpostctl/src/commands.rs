//! Subcommand implementations

use crate::errors::{EXIT_NO_CONTENT, EXIT_SUCCESS};
use crate::logging::PassLogEntry;
use anyhow::{Context, Result};
use outpost_common::{
    load_output_definitions, DispatchConfig, DispatchReport, DisplaySink, OutputActionDispatcher,
    OutputContent, OutputDefinition, Response,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "outpost.toml";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub response: PathBuf,
    pub outputs: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub no_exec: bool,
}

/// Prints each display chunk as soon as the dispatcher appends it
#[derive(Debug, Default)]
pub struct StdoutSink;

impl DisplaySink for StdoutSink {
    fn show(&self, chunk: &str) {
        println!("{}\n", chunk);
    }
}

/// Read a response file. JSON objects and strings are parsed, anything
/// else is taken as plain text.
pub fn load_response(path: &Path) -> Result<Response> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read response {}", path.display()))?;
    Ok(Response::parse(&raw))
}

pub fn load_definitions(path: &Path) -> Result<Vec<OutputDefinition>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read outputs {}", path.display()))?;
    let definitions = load_output_definitions(&raw)
        .with_context(|| format!("Invalid output definitions in {}", path.display()))?;
    Ok(definitions)
}

pub fn load_config(path: Option<&Path>) -> Result<DispatchConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    DispatchConfig::load(path).with_context(|| format!("Invalid config {}", path.display()))
}

/// Full pass with a JSONL log entry
pub fn run(options: &RunOptions) -> Result<i32> {
    let started = Instant::now();
    let mut entry = PassLogEntry::new(options.response.display().to_string());

    let result = run_pass(options, Box::new(StdoutSink));

    entry.duration_ms = started.elapsed().as_millis() as u64;
    let code = match result {
        Ok((code, report, output_count)) => {
            print_summary(&report);
            entry.ok = true;
            entry.output_count = output_count;
            entry.resolved_count = report.resolved;
            entry.created_files = report
                .created_files
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            entry.executed = report.executed().iter().map(|s| s.to_string()).collect();
            Ok(code)
        }
        Err(e) => {
            entry.error = Some(format!("{:#}", e));
            Err(e)
        }
    };

    if let Err(e) = entry.write() {
        warn!("Could not write pass log: {}", e);
    }
    code
}

/// Load inputs and dispatch once. Returns the exit code, the report and
/// the number of declared outputs.
pub fn run_pass(
    options: &RunOptions,
    sink: Box<dyn DisplaySink>,
) -> Result<(i32, DispatchReport, usize)> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(dir) = &options.output_dir {
        config.output_dir = dir.clone();
    }
    if options.no_exec {
        config.commands.enabled = false;
    }

    let definitions = load_definitions(&options.outputs)?;
    let response = load_response(&options.response)?;
    info!(
        "Dispatching {} output(s) from {}",
        definitions.len(),
        options.response.display()
    );

    let dispatcher = OutputActionDispatcher::new(config).with_sink(sink);
    let report = dispatcher.dispatch(&response, &definitions);

    let code = if report.fell_back || report.resolved == 0 {
        EXIT_NO_CONTENT
    } else {
        EXIT_SUCCESS
    };
    Ok((code, report, definitions.len()))
}

/// Text the sink has not already printed, then the created files
fn print_summary(report: &DispatchReport) {
    if report.fell_back || report.resolved == 0 {
        println!("{}", report.display);
    } else {
        for warning in &report.warnings {
            println!("{}", warning);
        }
    }
    for path in &report.created_files {
        eprintln!("Created {}", path.display());
    }
}

/// Resolve only; name → content as a JSON object
pub fn extract(response: &Path, outputs: &Path, config: Option<&Path>) -> Result<(i32, Value)> {
    let config = load_config(config)?;
    let definitions = load_definitions(outputs)?;
    let response = load_response(response)?;

    let resolved = OutputActionDispatcher::new(config).resolve(&response, &definitions)?;

    let mut found = Map::new();
    for output in &resolved {
        if let Some(content) = output.content() {
            let value = match content {
                OutputContent::Text(text) => Value::String(text.clone()),
                OutputContent::Structured(value) => value.clone(),
            };
            found.insert(output.definition.name.clone(), value);
        }
    }

    let code = if found.is_empty() {
        EXIT_NO_CONTENT
    } else {
        EXIT_SUCCESS
    };
    Ok((code, Value::Object(found)))
}
