use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::{emit, SessionEvent};

/// How long a cancelled command's process group gets between SIGTERM and SIGKILL.
#[cfg(unix)]
const KILL_GRACE: std::time::Duration = std::time::Duration::from_millis(200);

/// Bytes and exit code captured from one shell run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub exit_code: i32,
    pub bytes: Vec<u8>,
}

/// Runs command strings through an external interpreter in "run string" mode
/// (`sh -c <cmd>`, `cmd /C <cmd>`).
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    program: String,
    args: Vec<String>,
}

impl ShellLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.shell.clone(), config.shell_args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `command` with `cwd` as its working directory.
    ///
    /// stdout and stderr are merged in arrival order. Each chunk is forwarded
    /// as `SessionEvent::Output` while it is captured. If `cancel` fires first
    /// the child is killed and whatever was captured is dropped.
    pub async fn run(
        &self,
        command: &str,
        cwd: &Path,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<SessionEvent>>,
    ) -> Result<RawOutput> {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        tracing::info!(shell = %self.program, cwd = ?cwd, "running: {}", command);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // A group of its own, so cancelling reaches every job the shell starts.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| SessionError::Launch {
            program: self.program.clone(),
            source,
        })?;

        // Both pipes feed one channel so the interleaving follows arrival order.
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, tx.clone()));
        }
        drop(tx);

        let mut captured = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    terminate(&mut child).await;
                    return Err(SessionError::Cancelled);
                }
                chunk = rx.recv() => match chunk {
                    Some(bytes) => {
                        captured.extend_from_slice(&bytes);
                        if !emit(events, cancel, SessionEvent::Output(bytes)).await {
                            terminate(&mut child).await;
                            return Err(SessionError::Cancelled);
                        }
                    }
                    None => break,
                },
            }
        }

        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = waited else {
            terminate(&mut child).await;
            return Err(SessionError::Cancelled);
        };

        let exit_code = exit_code(status.map_err(SessionError::Wait)?);
        tracing::debug!(exit_code, bytes = captured.len(), "shell finished");

        Ok(RawOutput {
            exit_code,
            bytes: captured,
        })
    }
}

/// Forward everything from one pipe until EOF or the receiver goes away.
async fn pump<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("pipe read failed: {}", e);
                break;
            }
        }
    }
}

async fn terminate(child: &mut Child) {
    tracing::warn!(pid = ?child.id(), "cancelling shell process");

    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            kill_process_group(pid, child).await;
            return;
        }
    }

    if let Err(e) = child.kill().await {
        tracing::warn!("failed to kill shell process: {}", e);
    }
}

/// SIGTERM the group, give it `KILL_GRACE`, SIGKILL whatever is left, reap the shell.
#[cfg(unix)]
async fn kill_process_group(pid: u32, child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(pid as i32);

    if let Err(e) = killpg(group, Signal::SIGTERM) {
        tracing::debug!(pid, "SIGTERM to process group failed: {}", e);
    }

    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        tracing::debug!(pid, "shell outlived SIGTERM");
    }

    // The group id stays valid while any member is alive, even after the shell is reaped.
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        tracing::debug!(pid, "SIGKILL to process group failed: {}", e);
    }

    if let Err(e) = child.wait().await {
        tracing::warn!(pid, "failed to reap shell process: {}", e);
    }
}

/// Exit code as a shell reports it: `128 + n` for death by signal `n`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
