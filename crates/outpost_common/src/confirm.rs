//! Command confirmation flow
//!
//! A command found in a response is never run without an explicit yes from
//! the user. The prompt and the shell are behind traits so callers (and
//! tests) can script them.

use crate::config::CommandConfig;
use crate::error::{OutpostError, Result};
use crate::extract::fence::strip_fence;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::process::Command;
use tracing::{info, warn};

/// Asks the user whether a command may run
pub trait Confirmer {
    fn confirm(&self, source: &str, command: &str) -> bool;
}

/// Runs a confirmed command
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<CommandOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Result of one pass through the confirmation flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Executed(CommandOutcome),
    Declined,
    Failed(String),
    /// Nothing left to run after stripping
    Empty,
}

/// Interactive prompt on stderr/stdin
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

impl TerminalConfirmer {
    fn prompt(source: &str, command: &str) -> io::Result<bool> {
        let mut err = io::stderr();
        writeln!(err)?;
        writeln!(err, "{}", "══════════════════════════════════════════════════".yellow())?;
        writeln!(err, "{} {}", "[SECURITY WARNING]".bright_red().bold(), "About to run a shell command".bold())?;
        writeln!(err, "{}", "══════════════════════════════════════════════════".yellow())?;
        writeln!(err, "Source output: {}", source.cyan())?;
        writeln!(err, "Command:")?;
        for line in command.lines() {
            writeln!(err, "  {}", line.bold())?;
        }
        writeln!(err)?;
        write!(err, "Run this command? [y/N]: ")?;
        err.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, source: &str, command: &str) -> bool {
        match Self::prompt(source, command) {
            Ok(approved) => approved,
            Err(e) => {
                warn!("Could not read confirmation for '{}': {}", source, e);
                false
            }
        }
    }
}

/// Runs commands through the configured host shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    config: CommandConfig,
}

impl ShellRunner {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(CommandConfig::default())
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<CommandOutcome> {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg(&self.config.shell_flag).arg(command);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| {
            OutpostError::Command(format!("failed to launch {}: {}", self.config.shell, e))
        })?;

        Ok(CommandOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Remove fence wrapping and `$ ` prompt markers
pub fn strip_command(raw: &str) -> String {
    strip_fence(raw)
        .lines()
        .map(|line| {
            let t = line.trim_start();
            t.strip_prefix("$ ").unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Strip, confirm, run. Never fails the caller: every outcome is a value.
pub fn confirm_and_run(
    source: &str,
    raw: &str,
    confirmer: &dyn Confirmer,
    runner: &dyn CommandRunner,
) -> CommandResult {
    let command = strip_command(raw);
    if command.is_empty() {
        warn!("Output '{}' has no command to run", source);
        return CommandResult::Empty;
    }

    if !confirmer.confirm(source, &command) {
        warn!("Command from '{}' declined", source);
        return CommandResult::Declined;
    }

    match runner.run(&command) {
        Ok(outcome) => {
            if outcome.success {
                info!("Command from '{}' succeeded", source);
            } else {
                warn!(
                    "Command from '{}' exited with {:?}",
                    source, outcome.exit_code
                );
            }
            CommandResult::Executed(outcome)
        }
        Err(e) => {
            warn!("Command from '{}' failed: {}", source, e);
            CommandResult::Failed(e.to_string())
        }
    }
}
