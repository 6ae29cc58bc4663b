//! Subprocess seam for rclone invocations

use artifacts_core::{ArtifactError, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Raw outcome of one rclone invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit status; `-1` when the process was terminated by a signal
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

/// Runs one rclone subcommand and reports its exit status and output.
///
/// A non-zero exit is not an error at this level; only failing to run the
/// process at all (spawn failure, timeout) is.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, command: &str, args: &[OsString]) -> Result<ToolOutput>;
}

/// Runs rclone as a child process, bounded by a timeout
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, command: &str, args: &[OsString]) -> Result<ToolOutput> {
        debug!(program = %self.program.display(), command, ?args, "Running rclone");

        let mut cmd = Command::new(&self.program);
        cmd.arg(command)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Dropping the output future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ArtifactError::ToolTimeout {
                command: command.to_string(),
                after: self.timeout,
            })?
            .map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("failed to run {}: {}", self.program.display(), e),
                )
            })?;

        let result = ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command, code = result.code, "rclone finished");

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_process_runner_reports_exit_code_and_output() {
        let runner = ProcessRunner::new("sh", Duration::from_secs(10));
        let args = [OsString::from("printf out; printf err >&2; exit 3")];

        let output = runner.run("-c", &args).await.unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout_text(), "out");
        assert_eq!(output.stderr, "err");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_process_runner_times_out() {
        let runner = ProcessRunner::new("sh", Duration::from_millis(100));
        let args = [OsString::from("sleep 5")];

        match runner.run("-c", &args).await {
            Err(ArtifactError::ToolTimeout { command, .. }) => assert_eq!(command, "-c"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let runner = ProcessRunner::new("/nonexistent/rclone", Duration::from_secs(5));
        assert!(matches!(
            runner.run("version", &[]).await,
            Err(ArtifactError::Io(_))
        ));
    }
}
