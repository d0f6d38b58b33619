use std::{
    env,
    fs::{self, create_dir_all},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::registry::OverflowPolicy;

/// What a failed `cd` does to the interpreter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdFailure {
    /// Print the error and keep reading commands.
    #[default]
    Report,
    /// Exit the interpreter with status 1.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub prompt: String,
    pub max_line_length: usize,
    pub registry_capacity: usize,
    pub registry_overflow: OverflowPolicy,
    pub cd_failure: CdFailure,
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: ": ".to_string(),
            max_line_length: 2048,
            registry_capacity: 5000,
            registry_overflow: OverflowPolicy::Reject,
            cd_failure: CdFailure::Report,
            history: true,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "smallsh")
}

//config file
pub fn config_file_path() -> Option<PathBuf> {
    env::var_os("SMALLSH_CONFIG")
        .map(PathBuf::from)
        .or_else(|| project_dirs().map(|dirs| dirs.config_dir().join("config.json")))
}

/// Loads the configuration, writing a default file on first run.
pub fn init() -> Config {
    let Some(config_path) = config_file_path() else {
        return Config::default();
    };

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            let _ = create_dir_all(parent);
        }
        if let Ok(default) = serde_json::to_string_pretty(&Config::default()) {
            let _ = fs::write(&config_path, default);
        }
    }
    load_config(&config_path)
}

pub fn load_config(path: &Path) -> Config {
    match fs::read_to_string(path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            warn!("ignoring malformed config {}: {e}", path.display());
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

fn parse_config(content: &str) -> serde_json::Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_json::from_str(content)
}

//history file
pub fn history_file_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("history"))
}
