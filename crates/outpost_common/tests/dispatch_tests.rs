//! Tests for the output action dispatcher: ordering, failures, fallbacks.

use outpost_common::confirm::{CommandOutcome, CommandRunner, Confirmer};
use outpost_common::dispatcher::{
    DispatchEvent, DisplaySink, OutputActionDispatcher, OutputOutcome, NO_CONTENT,
};
use outpost_common::outputs::{OutputAction, OutputDefinition, OutputType};
use outpost_common::response::Response;
use outpost_common::{DispatchConfig, Result};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

type Log = Rc<RefCell<Vec<String>>>;

struct ScriptedConfirmer {
    log: Log,
    decline: Vec<&'static str>,
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, source: &str, command: &str) -> bool {
        self.log.borrow_mut().push(format!("confirm:{}", source));
        !self.decline.iter().any(|d| command.contains(d))
    }
}

struct RecordingRunner {
    log: Log,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str) -> Result<CommandOutcome> {
        self.log.borrow_mut().push(format!("run:{}", command));
        Ok(CommandOutcome {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

struct RecordingSink {
    log: Log,
}

impl DisplaySink for RecordingSink {
    fn show(&self, chunk: &str) {
        self.log.borrow_mut().push(format!("display:{}", chunk));
    }
}

fn dispatcher(config: DispatchConfig, log: &Log, decline: Vec<&'static str>) -> OutputActionDispatcher {
    OutputActionDispatcher::new(config)
        .with_confirmer(Box::new(ScriptedConfirmer {
            log: log.clone(),
            decline,
        }))
        .with_runner(Box::new(RecordingRunner { log: log.clone() }))
        .with_sink(Box::new(RecordingSink { log: log.clone() }))
}

fn runs(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|entry| entry.starts_with("run:"))
        .cloned()
        .collect()
}

#[test]
fn test_explanation_then_command_runs_immediately() {
    let dir = TempDir::new().unwrap();
    let log: Log = Rc::default();
    let config = DispatchConfig::default().with_output_dir(dir.path());

    let response = Response::parse(r#"{"results": {"explanation": "Do X", "command": "echo hi"}}"#);
    let defs = vec![
        OutputDefinition::new("explanation", OutputType::Markdown, OutputAction::Display),
        OutputDefinition::new("command", OutputType::Code, OutputAction::Execute),
    ];

    let report = dispatcher(config, &log, vec![]).dispatch(&response, &defs);

    assert!(report.display.contains("Do X"));
    assert!(!report.fell_back);
    assert!(report.created_files.is_empty());
    assert_eq!(
        *log.borrow(),
        vec![
            "display:Do X".to_string(),
            "confirm:command".to_string(),
            "run:echo hi".to_string(),
        ]
    );
    assert_eq!(
        report.outcome("command"),
        Some(&OutputOutcome::Executed {
            success: true,
            exit_code: Some(0)
        })
    );
}

#[test]
fn test_command_waits_for_later_explanation() {
    let log: Log = Rc::default();
    let response = Response::parse("```bash\nmake deploy\n```\n\n## Why\nDeploys the site to staging.");
    let defs = vec![
        OutputDefinition::new("command", OutputType::Code, OutputAction::Execute),
        OutputDefinition::new("why", OutputType::Text, OutputAction::Display),
    ];

    let report = dispatcher(DispatchConfig::default(), &log, vec![]).dispatch(&response, &defs);

    let entries = log.borrow().clone();
    let shown = entries
        .iter()
        .position(|e| e == "display:Deploys the site to staging.")
        .unwrap();
    let ran = entries.iter().position(|e| e == "run:make deploy").unwrap();
    assert!(shown < ran);
    assert_eq!(
        report.events,
        vec![
            DispatchEvent::Displayed("why".to_string()),
            DispatchEvent::Executed("command".to_string()),
        ]
    );
}

#[test]
fn test_trailing_command_runs_before_deferred_one() {
    let log: Log = Rc::default();
    let response = Response::parse(
        r#"{"results": {"first": "echo one", "note": "Read this first", "second": "echo two"}}"#,
    );
    let defs = vec![
        OutputDefinition::new("first", OutputType::Code, OutputAction::Execute),
        OutputDefinition::new("note", OutputType::Text, OutputAction::Display),
        OutputDefinition::new("second", OutputType::Code, OutputAction::Execute),
    ];

    let report = dispatcher(DispatchConfig::default(), &log, vec![]).dispatch(&response, &defs);

    assert_eq!(runs(&log), vec!["run:echo two", "run:echo one"]);
    assert_eq!(report.executed(), vec!["second", "first"]);
}

#[test]
fn test_unparseable_empty_response_is_graceful() {
    let dir = TempDir::new().unwrap();
    let log: Log = Rc::default();
    let config = DispatchConfig::default().with_output_dir(dir.path());
    let defs = vec![OutputDefinition::new("summary", OutputType::Text, OutputAction::Write)];

    let report = dispatcher(config, &log, vec![]).dispatch(&Response::parse(""), &defs);

    assert_eq!(report.display, NO_CONTENT);
    assert!(report.created_files.is_empty());
    assert_eq!(report.resolved, 0);
    assert!(matches!(report.outcome("summary"), Some(OutputOutcome::Failed { .. })));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_declined_command_does_not_stop_the_pass() {
    let log: Log = Rc::default();
    let response = Response::parse(r#"{"results": {"cleanup": "rm -rf build", "status": "git status"}}"#);
    let defs = vec![
        OutputDefinition::new("cleanup", OutputType::Code, OutputAction::Execute),
        OutputDefinition::new("status", OutputType::Code, OutputAction::Execute),
    ];

    let report = dispatcher(DispatchConfig::default(), &log, vec!["rm -rf"]).dispatch(&response, &defs);

    assert_eq!(runs(&log), vec!["run:git status"]);
    assert_eq!(report.outcome("cleanup"), Some(&OutputOutcome::Declined));
    assert!(matches!(
        report.outcome("status"),
        Some(OutputOutcome::Executed { success: true, .. })
    ));
}

#[test]
fn test_duplicate_names_fall_back_to_raw_text() {
    let log: Log = Rc::default();
    let defs = vec![
        OutputDefinition::new("answer", OutputType::Text, OutputAction::Display),
        OutputDefinition::new("answer", OutputType::Code, OutputAction::Execute),
    ];

    let report = dispatcher(DispatchConfig::default(), &log, vec![])
        .dispatch(&Response::parse("plain answer\n"), &defs);

    assert!(report.fell_back);
    assert_eq!(report.display, "plain answer");
    assert!(runs(&log).is_empty());
}

#[test]
fn test_disabled_commands_are_shown_not_run() {
    let log: Log = Rc::default();
    let mut config = DispatchConfig::default();
    config.commands.enabled = false;

    let response = Response::parse(r#"{"results": {"command": "echo hi"}}"#);
    let defs = vec![OutputDefinition::new("command", OutputType::Code, OutputAction::Execute)];

    let report = dispatcher(config, &log, vec![]).dispatch(&response, &defs);

    assert!(runs(&log).is_empty());
    assert_eq!(report.outcome("command"), Some(&OutputOutcome::Skipped));
    assert_eq!(report.display, "```\necho hi\n```");
}

#[test]
fn test_missing_required_output_warns_optional_does_not() {
    let log: Log = Rc::default();
    let response = Response::parse(r#"{"results": {"summary": "All services healthy"}}"#);
    let defs = vec![
        OutputDefinition::new("summary", OutputType::Text, OutputAction::Display),
        OutputDefinition::new("details", OutputType::Text, OutputAction::Display),
        OutputDefinition::new("extras", OutputType::Text, OutputAction::Display).optional(),
    ];

    let report = dispatcher(DispatchConfig::default(), &log, vec![]).dispatch(&response, &defs);

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("details"));
    assert!(report.display.starts_with("All services healthy\n\n"));
    assert!(report.display.ends_with("Required output 'details' was not found."));
    assert_eq!(report.outcome("extras"), Some(&OutputOutcome::Skipped));
}

#[test]
fn test_sole_output_takes_whole_response() {
    let log: Log = Rc::default();
    let defs = vec![OutputDefinition::new("answer", OutputType::Text, OutputAction::Display)];

    let report = dispatcher(DispatchConfig::default(), &log, vec![])
        .dispatch(&Response::parse("The disk is 80% full."), &defs);

    assert_eq!(report.display, "The disk is 80% full.");
    assert_eq!(report.resolved, 1);
}

#[test]
fn test_sole_command_output_never_takes_prose() {
    let log: Log = Rc::default();
    let defs = vec![OutputDefinition::new("command", OutputType::Code, OutputAction::Execute)];

    let report = dispatcher(DispatchConfig::default(), &log, vec![])
        .dispatch(&Response::parse("I cannot help with that request, sorry."), &defs);

    assert!(!log
        .borrow()
        .iter()
        .any(|e| e.starts_with("confirm:") || e.starts_with("run:")));
    assert_eq!(report.resolved, 0);
    assert!(matches!(report.outcome("command"), Some(OutputOutcome::Failed { .. })));
    assert!(report.executed().is_empty());
}

#[test]
fn test_write_failure_does_not_block_display() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "file").unwrap();

    let log: Log = Rc::default();
    let config = DispatchConfig::default().with_output_dir(&blocker);
    let response = Response::parse(r#"{"results": {"notes": "keep this", "summary": "done"}}"#);
    let defs = vec![
        OutputDefinition::new("notes", OutputType::Text, OutputAction::Write),
        OutputDefinition::new("summary", OutputType::Text, OutputAction::Display),
    ];

    let report = dispatcher(config, &log, vec![]).dispatch(&response, &defs);

    assert!(matches!(report.outcome("notes"), Some(OutputOutcome::Failed { .. })));
    assert_eq!(report.outcome("summary"), Some(&OutputOutcome::Displayed));
    assert!(report.created_files.is_empty());
    assert_eq!(report.display, "done");
}
