//! Error types for rclone-artifacts

use std::time::Duration;
use thiserror::Error;

/// Main error type for artifact repository operations
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Bad URI, unknown scheme, unreadable config or unregistered remote
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The rclone config payload could not be turned into a session
    #[error("Tool initialization error: {0}")]
    ToolInitialization(String),

    /// rclone exited non-zero where the caller expects success.
    /// `stderr` is rclone's own error text, untouched.
    #[error("rclone {command} failed with exit code {code}: {stderr}")]
    ToolExecution {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("rclone {command} timed out after {after:?}")]
    ToolTimeout { command: String, after: Duration },

    /// A response did not match the shape the operation expects
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtifactError {
    /// Build a `ToolExecution` error from a subcommand name and its raw outcome
    pub fn tool_execution(command: &str, code: i32, stderr: impl Into<String>) -> Self {
        ArtifactError::ToolExecution {
            command: command.to_string(),
            code,
            stderr: stderr.into().trim_end().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
