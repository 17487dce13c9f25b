pub mod builtins;
pub mod config;
pub mod cwd;
pub mod error;
pub mod history;
pub mod session;
pub mod shell;

// Re-export the main struct so users can just use `cmdsession_core::CommandSession`
pub use session::CommandSession;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use history::{HistoryFile, HistoryLog};
pub use shell::ShellLauncher;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Substituted for output that is not valid UTF-8.
pub const DECODE_ERROR_PLACEHOLDER: &str = "<decode error>";

/// Outcome of one `execute` call. Replaced wholesale on every execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub combined_output: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, combined_output: impl Into<String>) -> Self {
        Self {
            exit_code,
            combined_output: combined_output.into(),
        }
    }

    /// Exit code 0 with no output. Also what empty input returns.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The event stream from a session. Front-ends listen to this to know when to redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Output(Vec<u8>),                // Raw bytes from the shell, stdout and stderr merged
    DirectoryChanged(PathBuf),      // A `cd` succeeded
    HistoryCleared,                 // `clear` ran
    Finished(ExecutionResult),      // A command produced its result
}

/// Send an event if anyone is listening. A dropped receiver is not an error.
///
/// Waits for room on a full channel until `cancel` fires; returns `false` if
/// it gave up because of that.
pub(crate) async fn emit(
    events: Option<&mpsc::Sender<SessionEvent>>,
    cancel: &CancellationToken,
    event: SessionEvent,
) -> bool {
    let Some(tx) = events else {
        return true;
    };

    tokio::select! {
        biased;
        sent = tx.send(event) => {
            if sent.is_err() {
                tracing::trace!("session event receiver dropped");
            }
            true
        }
        _ = cancel.cancelled() => false,
    }
}
