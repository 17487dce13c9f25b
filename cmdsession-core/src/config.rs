//! Session configuration.
//!
//! Loaded from `~/.cmdsession/config.toml` by default:
//!
//! ```toml
//! # Interpreter and its "run this string" flag
//! shell = "/bin/bash"
//! shell_args = ["-c"]
//!
//! # Where the session starts (default: the process's directory)
//! start_dir = "/home/user/projects"
//!
//! # Where a front-end keeps history between runs (default: not persisted)
//! history_file = "/home/user/.cmdsession/history.json"
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cwd::home_dir;
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interpreter program
    pub shell: String,
    /// Arguments placed before the command text
    pub shell_args: Vec<String>,
    /// Starting working directory
    pub start_dir: Option<PathBuf>,
    /// History persistence for front-ends
    pub history_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let (shell, flag) = default_shell();
        Self {
            shell: shell.to_string(),
            shell_args: vec![flag.to_string()],
            start_dir: None,
            history_file: None,
        }
    }
}

impl SessionConfig {
    /// `~/.cmdsession/config.toml`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".cmdsession").join("config.toml"))
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SessionError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| SessionError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = ?path, shell = %config.shell, "config loaded");
        Ok(config)
    }
}

fn default_shell() -> (&'static str, &'static str) {
    if cfg!(windows) {
        ("cmd", "/C")
    } else {
        ("/bin/sh", "-c")
    }
}
