//! Per-pass JSONL log
//!
//! One line per `outpostctl run`, appended to a file found through an
//! XDG fallback chain.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Explicit log file override
pub const LOG_FILE_ENV: &str = "OUTPOSTCTL_LOG_FILE";

/// Log entry for each dispatch pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassLogEntry {
    /// RFC 3339 timestamp
    pub ts: String,

    /// Request ID (UUID)
    pub req_id: String,

    /// Where the response came from
    pub response_source: String,

    pub output_count: usize,

    pub resolved_count: usize,

    #[serde(default)]
    pub created_files: Vec<String>,

    /// Outputs whose command ran
    #[serde(default)]
    pub executed: Vec<String>,

    pub duration_ms: u64,

    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PassLogEntry {
    pub fn new(response_source: impl Into<String>) -> Self {
        Self {
            ts: Self::now(),
            req_id: Self::generate_req_id(),
            response_source: response_source.into(),
            output_count: 0,
            resolved_count: 0,
            created_files: Vec::new(),
            executed: Vec::new(),
            duration_ms: 0,
            ok: false,
            error: None,
        }
    }

    /// Discover log file path with fallback chain
    ///
    /// Priority:
    /// 1. $OUTPOSTCTL_LOG_FILE
    /// 2. $XDG_STATE_HOME/outpost/passes.jsonl
    /// 3. ~/.local/state/outpost/passes.jsonl
    pub fn discover_log_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(LOG_FILE_ENV) {
            return Some(PathBuf::from(path));
        }

        if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
            return Some(Path::new(&xdg_state).join("outpost").join("passes.jsonl"));
        }

        if let Ok(home) = std::env::var("HOME") {
            return Some(
                Path::new(&home)
                    .join(".local")
                    .join("state")
                    .join("outpost")
                    .join("passes.jsonl"),
            );
        }

        None
    }

    /// Append to the discovered log, falling back to stderr so stdout stays
    /// free for display output
    pub fn write(&self) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(self)?;

        if let Some(path) = Self::discover_log_path() {
            if Self::write_to_file(&json, &path).is_ok() {
                return Ok(());
            }
        }

        eprintln!("{}", json);
        Ok(())
    }

    /// Append to a specific file
    pub fn append_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string(self)?;
        Self::write_to_file(&json, path)
    }

    fn write_to_file(json: &str, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", json)?;
        Ok(())
    }

    pub fn generate_req_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}
