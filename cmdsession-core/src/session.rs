use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::builtins::{self, Builtin, CommandParser, CommandType};
use crate::config::SessionConfig;
use crate::cwd;
use crate::error::{Result, SessionError};
use crate::history::HistoryLog;
use crate::shell::ShellLauncher;
use crate::{emit, ExecutionResult, SessionEvent, DECODE_ERROR_PLACEHOLDER};

/// One logical terminal: working directory, history and the last result.
///
/// `execute` takes `&mut self`, so only one command can be in flight per
/// session. Front-ends that need to stay responsive drive it from a task and
/// keep the `CancellationToken` around.
#[derive(Debug)]
pub struct CommandSession {
    config: SessionConfig,
    launcher: ShellLauncher,
    working_directory: PathBuf,
    previous_directory: Option<PathBuf>,
    history: HistoryLog,
    last_result: ExecutionResult,
}

impl CommandSession {
    /// Start in the process's current directory with the default shell.
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let process_dir = std::env::current_dir().map_err(SessionError::CurrentDir)?;
        let start = match &config.start_dir {
            Some(dir) => {
                let expanded = cwd::expand_tilde(&dir.to_string_lossy());
                cwd::normalize(&process_dir.join(expanded))
            }
            None => process_dir,
        };

        if !start.is_dir() {
            return Err(SessionError::InvalidStartDir(start));
        }

        tracing::debug!(cwd = ?start, shell = %config.shell, "session started");

        Ok(Self {
            launcher: ShellLauncher::from_config(&config),
            config,
            working_directory: start,
            previous_directory: None,
            history: HistoryLog::new(),
            last_result: ExecutionResult::empty(),
        })
    }

    /// Seed history restored by a front-end. The cursor starts at the tail.
    pub fn with_history(mut self, entries: Vec<String>) -> Self {
        self.history = HistoryLog::from_entries(entries);
        self
    }

    /// Run one command line and wait for its result.
    pub async fn execute(
        &mut self,
        command_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        self.dispatch(command_text, cancel, None).await
    }

    /// Like `execute`, also reporting progress on `events` as it happens.
    pub async fn execute_streaming(
        &mut self,
        command_text: &str,
        cancel: &CancellationToken,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Result<ExecutionResult> {
        self.dispatch(command_text, cancel, Some(events)).await
    }

    pub fn browse_previous(&mut self) -> Option<&str> {
        self.history.browse_previous()
    }

    pub fn browse_next(&mut self) -> Option<&str> {
        self.history.browse_next()
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn cursor(&self) -> usize {
        self.history.cursor()
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Target of `cd -`.
    pub fn previous_directory(&self) -> Option<&Path> {
        self.previous_directory.as_deref()
    }

    pub fn last_result(&self) -> &ExecutionResult {
        &self.last_result
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ----------------------------------------------------------------
    // Dispatch
    // ----------------------------------------------------------------

    async fn dispatch(
        &mut self,
        command_text: &str,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<SessionEvent>>,
    ) -> Result<ExecutionResult> {
        if command_text.trim().is_empty() {
            return Ok(ExecutionResult::empty());
        }

        let parsed = CommandParser::parse(command_text);
        tracing::debug!(?parsed, "dispatching");

        let result = match parsed {
            CommandType::Builtin(Builtin::Cd(arg)) => self.change_directory(&arg, cancel, events).await,

            CommandType::Builtin(Builtin::History) => {
                ExecutionResult::new(0, builtins::render_history(self.history.entries()))
            }

            // Not recorded: a cleared history stays empty.
            CommandType::Builtin(Builtin::Clear) => {
                self.history.clear();
                emit(events, cancel, SessionEvent::HistoryCleared).await;
                return Ok(self.finish(ExecutionResult::empty(), cancel, events).await);
            }

            CommandType::Shell(cmd) => {
                let raw = self
                    .launcher
                    .run(&cmd, &self.working_directory, cancel, events)
                    .await?;
                ExecutionResult::new(raw.exit_code, decode_output(raw.bytes))
            }
        };

        self.history.push(command_text);
        Ok(self.finish(result, cancel, events).await)
    }

    async fn finish(
        &mut self,
        result: ExecutionResult,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<SessionEvent>>,
    ) -> ExecutionResult {
        self.last_result = result.clone();
        // The result already stands; a cancel here only skips the notification.
        emit(events, cancel, SessionEvent::Finished(result.clone())).await;
        result
    }

    async fn change_directory(
        &mut self,
        arg: &str,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<SessionEvent>>,
    ) -> ExecutionResult {
        let resolved = cwd::resolve_cd(
            arg,
            &self.working_directory,
            self.previous_directory.as_deref(),
        );

        match resolved {
            Some(dir) => {
                tracing::info!(from = ?self.working_directory, to = ?dir, "directory changed");
                let old = std::mem::replace(&mut self.working_directory, dir.clone());
                self.previous_directory = Some(old);
                emit(events, cancel, SessionEvent::DirectoryChanged(dir)).await;
                ExecutionResult::empty()
            }
            None => {
                tracing::debug!(dir = arg, "cd target rejected");
                ExecutionResult::new(1, builtins::no_such_directory(arg))
            }
        }
    }
}

fn decode_output(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        tracing::warn!(
            valid_up_to = e.utf8_error().valid_up_to(),
            "shell output is not valid UTF-8"
        );
        DECODE_ERROR_PLACEHOLDER.to_string()
    })
}
