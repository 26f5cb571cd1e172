// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Minimal test-command runner used by the repair engine's validation step
//! (§4.G step 5): spawn a command, capture its output, and enforce a
//! timeout. No shell grammar, no pipelines, no redirections — the repair
//! engine only ever needs to run one whitelisted validation command per
//! repair attempt.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn { command: String, #[source] source: std::io::Error },
    #[error("waiting on `{command}` failed: {source}")]
    Wait { command: String, #[source] source: std::io::Error },
    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },
}

/// Outcome of a completed (non-timed-out) command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `command args...` in `cwd`, killing and reporting a [`ShellError::Timeout`]
/// if it runs longer than `timeout`.
pub async fn run_with_timeout(
    command: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutcome, ShellError> {
    let span = tracing::info_span!("shell.run", command, ?args, exit_code = tracing::field::Empty, duration_ms = tracing::field::Empty);
    async move {
        let start = std::time::Instant::now();

        let mut process = tokio::process::Command::new(command);
        process.args(args);
        process.current_dir(cwd);
        process.stdout(std::process::Stdio::piped());
        process.stderr(std::process::Stdio::piped());
        process.kill_on_drop(true);

        let mut child = process.spawn().map_err(|source| ShellError::Spawn { command: command.to_string(), source })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ShellError::Wait { command: command.to_string(), source })?,
            Err(_) => {
                return Err(ShellError::Timeout { command: command.to_string(), timeout_ms: timeout.as_millis() as u64 });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let span_ref = tracing::Span::current();
        span_ref.record("exit_code", exit_code);
        span_ref.record("duration_ms", duration_ms);

        Ok(CommandOutcome {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration_ms,
        })
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_exit_code_zero_and_captures_stdout() {
        let outcome = run_with_timeout("echo", &["hello".to_string()], Path::new("."), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(outcome.succeeded());
        assert!(outcome.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_errored() {
        let outcome = run_with_timeout("false", &[], Path::new("."), Duration::from_secs(5)).await.unwrap();
        assert!(!outcome.succeeded());
        assert_ne!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = run_with_timeout("definitely-not-a-real-binary", &[], Path::new("."), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run_with_timeout("sleep", &["5".to_string()], Path::new("."), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Timeout { .. }));
    }
}
