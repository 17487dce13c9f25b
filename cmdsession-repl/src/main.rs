// cmdsession-repl/src/main.rs

use anyhow::{Context, Result};
use cmdsession_core::{
    CommandSession, ExecutionResult, HistoryFile, SessionConfig, SessionError, SessionEvent,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_path(std::env::args().skip(1))? {
        Some(path) => SessionConfig::load(&path)?,
        None => SessionConfig::load_default()?,
    };

    let history_file = config.history_file.clone().map(HistoryFile::new);
    let mut session = CommandSession::with_config(config).context("failed to start session")?;
    if let Some(file) = &history_file {
        let entries = file.load().context("failed to load history")?;
        session = session.with_history(entries);
    }

    serve(
        &mut session,
        history_file.as_ref(),
        BufReader::new(tokio::io::stdin()),
        &mut tokio::io::stdout(),
        &mut tokio::io::stderr(),
    )
    .await
}

/// `--config <path>` is the only flag.
fn config_path(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(path)
}

/// Run the prompt loop, then save history however the loop ended.
async fn serve<R, W, E>(
    session: &mut CommandSession,
    history_file: Option<&HistoryFile>,
    input: R,
    out: &mut W,
    err: &mut E,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let outcome = repl_loop(session, input, out, err).await;

    let saved = match history_file {
        Some(file) => file
            .save(session.history())
            .context("failed to save history"),
        None => Ok(()),
    };

    outcome.and(saved)
}

async fn repl_loop<R, W, E>(
    session: &mut CommandSession,
    input: R,
    out: &mut W,
    err: &mut E,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        prompt(out, session).await?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                err.write_all(b"\n").await?;
                break;
            }
            line = lines.next_line() => line.context("stdin read failed")?,
        };

        let Some(line) = line else {
            break;
        };

        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        run_line(session, &line, out, err).await?;
    }

    Ok(())
}

async fn prompt<W: AsyncWrite + Unpin>(out: &mut W, session: &CommandSession) -> Result<()> {
    let text = format!("{} $ ", session.working_directory().display());
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Run one line, echoing output as it arrives. Ctrl+C cancels the command.
async fn run_line<W, E>(
    session: &mut CommandSession,
    line: &str,
    out: &mut W,
    err: &mut E,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(64);
    let mut streamed = false;

    let execution = session.execute_streaming(line, &cancel, &tx);
    tokio::pin!(execution);

    let outcome = loop {
        tokio::select! {
            outcome = &mut execution => break outcome,
            Some(event) = rx.recv() => {
                streamed |= render(event, out).await?;
            }
            _ = tokio::signal::ctrl_c() => cancel.cancel(),
        }
    };

    // Everything was sent before the future resolved.
    while let Ok(event) = rx.try_recv() {
        streamed |= render(event, out).await?;
    }

    match outcome {
        Ok(result) => report(&result, streamed, out, err).await,
        Err(SessionError::Cancelled) => {
            err.write_all(b"^C\n").await?;
            Ok(())
        }
        Err(e) => {
            let text = format!("cmdsession: {:#}\n", anyhow::Error::new(e));
            err.write_all(text.as_bytes()).await?;
            Ok(())
        }
    }
}

/// Write one event. Returns whether it carried command output.
async fn render<W: AsyncWrite + Unpin>(event: SessionEvent, out: &mut W) -> Result<bool> {
    match event {
        SessionEvent::Output(bytes) => {
            out.write_all(&bytes).await?;
            out.flush().await?;
            Ok(true)
        }
        SessionEvent::DirectoryChanged(dir) => {
            tracing::debug!(cwd = ?dir, "prompt directory updated");
            Ok(false)
        }
        SessionEvent::HistoryCleared | SessionEvent::Finished(_) => Ok(false),
    }
}

async fn report<W, E>(
    result: &ExecutionResult,
    streamed: bool,
    out: &mut W,
    err: &mut E,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    // Built-ins never stream; their text only lives in the result.
    if !streamed && !result.combined_output.is_empty() {
        out.write_all(result.combined_output.as_bytes()).await?;
        if !result.combined_output.ends_with('\n') {
            out.write_all(b"\n").await?;
        }
        out.flush().await?;
    }

    if !result.is_success() {
        err.write_all(format!("[exit {}]\n", result.exit_code).as_bytes())
            .await?;
        err.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    fn session_in(dir: &std::path::Path) -> CommandSession {
        let config = SessionConfig {
            start_dir: Some(dir.to_path_buf()),
            ..SessionConfig::default()
        };
        CommandSession::with_config(config).unwrap()
    }

    /// A terminal that has gone away.
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // ============================================================
    // Arguments
    // ============================================================

    #[test]
    fn test_config_flag_takes_path() {
        let path = config_path(args(&["--config", "/tmp/c.toml"])).unwrap();
        assert_eq!(path, Some(PathBuf::from("/tmp/c.toml")));

        let short = config_path(args(&["-c", "x.toml"])).unwrap();
        assert_eq!(short, Some(PathBuf::from("x.toml")));

        assert_eq!(config_path(args(&[])).unwrap(), None);
    }

    #[test]
    fn test_config_flag_without_value() {
        let e = config_path(args(&["--config"])).unwrap_err();
        assert!(e.to_string().contains("needs a path"));
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let e = config_path(args(&["--verbose"])).unwrap_err();
        assert!(e.to_string().contains("unknown argument: --verbose"));
    }

    // ============================================================
    // Reporting
    // ============================================================

    #[tokio::test]
    async fn test_report_prints_unstreamed_output_with_newline() {
        let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
        let result = ExecutionResult::new(0, "    1  ls");

        report(&result, false, &mut out, &mut err).await.unwrap();

        assert_eq!(out, b"    1  ls\n");
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_report_skips_streamed_output() {
        let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
        let result = ExecutionResult::new(0, "hi\n");

        report(&result, true, &mut out, &mut err).await.unwrap();

        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[tokio::test]
    async fn test_report_marks_nonzero_exit() {
        let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
        let result = ExecutionResult::new(3, "boom\n");

        report(&result, true, &mut out, &mut err).await.unwrap();

        assert!(out.is_empty());
        assert_eq!(err, b"[exit 3]\n");
    }

    #[tokio::test]
    async fn test_render_reports_output_only() {
        let mut out = Vec::<u8>::new();

        assert!(render(SessionEvent::Output(b"abc".to_vec()), &mut out).await.unwrap());
        assert!(!render(SessionEvent::HistoryCleared, &mut out).await.unwrap());

        assert_eq!(out, b"abc");
    }

    // ============================================================
    // History saving
    // ============================================================

    #[tokio::test]
    async fn test_history_saved_after_exit() {
        let dir = tempfile::tempdir().unwrap();
        let file = HistoryFile::new(dir.path().join("history.json"));
        let mut session = session_in(dir.path());
        let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());

        serve(&mut session, Some(&file), &b"cd .\nexit\n"[..], &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(file.load().unwrap(), vec!["cd .".to_string()]);
        assert!(String::from_utf8(out).unwrap().contains(" $ "));
    }

    #[tokio::test]
    async fn test_history_saved_when_terminal_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = HistoryFile::new(dir.path().join("history.json"));
        let mut session = session_in(dir.path()).with_history(vec!["cd ..".to_string()]);
        let mut err = Vec::<u8>::new();

        let outcome = serve(
            &mut session,
            Some(&file),
            &b"cd .\n"[..],
            &mut BrokenWriter,
            &mut err,
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(file.load().unwrap(), vec!["cd ..".to_string()]);
    }
}
