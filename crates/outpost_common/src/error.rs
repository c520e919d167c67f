//! Error types for Outpost.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OutpostError>;

#[derive(Error, Debug)]
pub enum OutpostError {
    #[error("Invalid output definition: {0}")]
    InvalidDefinition(String),

    #[error("Output '{0}' is declared more than once")]
    DuplicateOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OutpostError {
    pub fn code(&self) -> i32 {
        match self {
            OutpostError::InvalidDefinition(_) => -32100,
            OutpostError::DuplicateOutput(_) => -32101,
            OutpostError::Config(_) => -32102,
            OutpostError::Command(_) => -32103,
            OutpostError::Write { .. } => -32104,
            OutpostError::Io(_) => -32006,
            OutpostError::Json(_) => -32700,
            OutpostError::Yaml(_) => -32701,
            OutpostError::Internal(_) => -32603,
        }
    }
}

impl From<toml::de::Error> for OutpostError {
    fn from(err: toml::de::Error) -> Self {
        OutpostError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            OutpostError::InvalidDefinition(String::new()),
            OutpostError::DuplicateOutput(String::new()),
            OutpostError::Config(String::new()),
            OutpostError::Command(String::new()),
            OutpostError::Write {
                path: PathBuf::from("x"),
                message: String::new(),
            },
            OutpostError::Internal(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_duplicate_message_names_output() {
        let err = OutpostError::DuplicateOutput("summary".to_string());
        assert!(err.to_string().contains("summary"));
    }
}
