//! Configuration for a dispatch pass.
//!
//! Loads settings from a TOML file or falls back to defaults.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment override for the output directory
pub const OUTPUT_DIR_ENV: &str = "OUTPOST_OUTPUT_DIR";

/// Settings that shape one dispatch pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Directory that receives WRITE outputs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// HTML outputs with one of these names are written as `index.html`
    #[serde(default = "default_site_root_names")]
    pub site_root_names: Vec<String>,

    /// Prefix displayed outputs with a `## Title` heading
    #[serde(default)]
    pub display_headings: bool,

    /// Use the whole response when a single declared output cannot be located
    #[serde(default = "default_sole_output_fallback")]
    pub sole_output_fallback: bool,

    /// Literal newlines must be fewer than `ratio * escaped` for unescaping to run
    #[serde(default = "default_unescape_ratio")]
    pub unescape_ratio: f64,

    #[serde(default)]
    pub commands: CommandConfig,
}

/// Shell execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// When false, EXECUTE outputs are never run
    #[serde(default = "default_commands_enabled")]
    pub enabled: bool,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_shell_flag")]
    pub shell_flag: String,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_site_root_names() -> Vec<String> {
    ["index", "home", "homepage", "website", "site", "main"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sole_output_fallback() -> bool {
    true
}

fn default_unescape_ratio() -> f64 {
    2.0
}

fn default_commands_enabled() -> bool {
    true
}

fn default_shell() -> String {
    if cfg!(target_os = "windows") {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}

fn default_shell_flag() -> String {
    if cfg!(target_os = "windows") {
        "/C".to_string()
    } else {
        "-c".to_string()
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enabled: default_commands_enabled(),
            shell: default_shell(),
            shell_flag: default_shell_flag(),
            working_dir: None,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            site_root_names: default_site_root_names(),
            display_headings: false,
            sole_output_fallback: default_sole_output_fallback(),
            unescape_ratio: default_unescape_ratio(),
            commands: CommandConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Load from `path`, using defaults when the file does not exist.
    ///
    /// The `OUTPOST_OUTPUT_DIR` environment variable overrides `output_dir`
    /// in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            let parsed = Self::from_toml(&raw)?;
            info!("Loaded dispatch config from {}", path.display());
            parsed
        } else {
            warn!("Config {} not found, using defaults", path.display());
            Self::default()
        };

        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.output_dir = PathBuf::from(dir);
            }
        }

        Ok(config)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Case-insensitive match against `site_root_names`
    pub fn is_site_root(&self, name: &str) -> bool {
        self.site_root_names
            .iter()
            .any(|root| root.eq_ignore_ascii_case(name.trim()))
    }
}
