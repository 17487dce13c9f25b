use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent a session operation from producing any result.
///
/// A command that runs and exits non-zero is not one of these; it comes back
/// as a normal `ExecutionResult`.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to launch shell `{program}`")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("command cancelled")]
    Cancelled,

    #[error("failed to wait for shell process")]
    Wait(#[source] io::Error),

    #[error("failed to determine current directory")]
    CurrentDir(#[source] io::Error),

    #[error("start directory {0:?} is not a directory")]
    InvalidStartDir(PathBuf),

    #[error("failed to read {path:?}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path:?}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid history file {path:?}")]
    ParseHistory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode history")]
    EncodeHistory(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
