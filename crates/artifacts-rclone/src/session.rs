//! rclone tool session
//!
//! A session owns a private copy of the rclone config and passes
//! `--config <copy>` ahead of the arguments of every invocation, so two
//! repositories never share config state.

use crate::runner::{ToolOutput, ToolRunner};
use artifacts_core::{ArtifactError, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// First line of the body of an rclone config encrypted with `rclone config encryption`
const ENCRYPTED_CONFIG_MARKER: &str = "RCLONE_ENCRYPT_V0:";

pub struct RcloneSession {
    runner: Arc<dyn ToolRunner>,
    config_file: NamedTempFile,
}

impl RcloneSession {
    /// Start a session from the text of an rclone config file
    pub fn new(payload: &str, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        validate_config(payload)?;

        let mut config_file = tempfile::Builder::new()
            .prefix("rclone-artifacts-")
            .suffix(".conf")
            .tempfile()
            .map_err(|e| {
                ArtifactError::ToolInitialization(format!("Failed to create config copy: {}", e))
            })?;
        let written = config_file.write_all(payload.as_bytes());
        written.and_then(|_| config_file.flush()).map_err(|e| {
            ArtifactError::ToolInitialization(format!("Failed to write config copy: {}", e))
        })?;

        Ok(Self {
            runner,
            config_file,
        })
    }

    /// Location of the private config copy
    pub fn config_path(&self) -> &Path {
        self.config_file.path()
    }

    /// Run a subcommand; non-zero exits are returned, not raised
    pub async fn run(&self, command: &str, args: &[OsString]) -> Result<ToolOutput> {
        let mut full_args = Vec::with_capacity(args.len() + 2);
        full_args.push(OsString::from("--config"));
        full_args.push(self.config_file.path().as_os_str().to_owned());
        full_args.extend_from_slice(args);

        self.runner.run(command, &full_args).await
    }

    /// Run a subcommand and turn a non-zero exit into `ToolExecution`
    pub async fn run_checked(&self, command: &str, args: &[OsString]) -> Result<ToolOutput> {
        let output = self.run(command, args).await?;
        if !output.success() {
            return Err(ArtifactError::tool_execution(
                command,
                output.code,
                output.stderr,
            ));
        }
        Ok(output)
    }

    /// Names of all configured remotes, each with its trailing `:`
    pub async fn list_remotes(&self) -> Result<Vec<String>> {
        let output = self.run_checked("listremotes", &[]).await?;
        Ok(output
            .stdout_text()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Check that `payload` is shaped like an rclone INI config.
///
/// Follows the INI dialect rclone reads: keys use `=` or `:` as delimiter,
/// and keys before the first header land in the default section. Encrypted
/// configs are opaque and passed through untouched.
pub fn validate_config(payload: &str) -> Result<()> {
    if payload
        .lines()
        .any(|line| line.trim() == ENCRYPTED_CONFIG_MARKER)
    {
        return Ok(());
    }

    for (idx, raw) in payload.lines().enumerate() {
        let line = raw.trim();
        let line_no = idx + 1;

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            match header.strip_suffix(']') {
                Some(name) if !name.trim().is_empty() => continue,
                _ => {
                    return Err(ArtifactError::ToolInitialization(format!(
                        "Malformed section header on line {}: {}",
                        line_no, line
                    )))
                }
            }
        }

        match line.find(['=', ':']) {
            Some(delim) if !line[..delim].trim().is_empty() => {}
            _ => {
                return Err(ArtifactError::ToolInitialization(format!(
                    "Unrecognised config line {}: {}",
                    line_no, line
                )))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_validate_accepts_rclone_config() {
        let payload = "\
# remotes
[myremote]
type = s3
provider = AWS
; comment
env_auth = true

[other]
type = local
";
        assert!(validate_config(payload).is_ok());
        assert!(validate_config("").is_ok());

        // colon delimiter and keys in the default section
        assert!(validate_config("[myremote]\ntype: local\n").is_ok());
        assert!(validate_config("global = 1\n[myremote]\ntype = local\n").is_ok());
        assert!(validate_config("[myremote]\nurl = http://host:8080/dav\n").is_ok());
    }

    #[test]
    fn test_validate_accepts_encrypted_config() {
        let payload = "# Encrypted rclone configuration File\n\nRCLONE_ENCRYPT_V0:\nc2VjcmV0IGJsb2I=\n";
        assert!(validate_config(payload).is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_payloads() {
        for payload in [
            "[myremote\ntype = s3\n",
            "[]\n",
            "[myremote]\njust some words\n",
            "[myremote]\n= value\n",
            "[myremote]\n: value\n",
            "just some words\n[myremote]\ntype = s3\n",
        ] {
            assert!(
                matches!(
                    validate_config(payload),
                    Err(ArtifactError::ToolInitialization(_))
                ),
                "payload should be rejected: {:?}",
                payload
            );
        }
    }

    #[test]
    fn test_session_writes_private_config_copy() {
        let runner = Arc::new(ScriptedRunner::new(|_, _| ToolOutput::default()));
        let session = RcloneSession::new("[myremote]\ntype = local\n", runner).unwrap();

        let copy = std::fs::read_to_string(session.config_path()).unwrap();
        assert_eq!(copy, "[myremote]\ntype = local\n");
    }

    #[tokio::test]
    async fn test_every_call_carries_config_flag() {
        let runner = Arc::new(ScriptedRunner::new(|_, _| {
            ToolOutput::new(0, "myremote:\n\nother:\n", "")
        }));
        let session = RcloneSession::new("[myremote]\ntype = local\n", runner.clone()).unwrap();

        let remotes = session.list_remotes().await.unwrap();
        assert_eq!(remotes, vec!["myremote:", "other:"]);

        let calls = runner.raw_calls();
        assert_eq!(calls.len(), 1);
        let (command, args) = &calls[0];
        assert_eq!(command, "listremotes");
        assert_eq!(args[0], "--config");
        assert_eq!(args[1], session.config_path().to_string_lossy());
    }

    #[tokio::test]
    async fn test_config_flag_precedes_caller_arguments() {
        let runner = Arc::new(ScriptedRunner::new(|_, _| ToolOutput::default()));
        let session = RcloneSession::new("[myremote]\ntype = local\n", runner.clone()).unwrap();

        let args = [OsString::from("./-report.txt"), OsString::from("myremote:/runs")];
        session.run("copy", &args).await.unwrap();

        let (_, args) = &runner.raw_calls()[0];
        let config = session.config_path().to_string_lossy().into_owned();
        assert_eq!(
            args,
            &vec![
                "--config".to_string(),
                config,
                "./-report.txt".to_string(),
                "myremote:/runs".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_remotes_surfaces_stderr() {
        let runner = Arc::new(ScriptedRunner::new(|_, _| {
            ToolOutput::new(1, "", "Failed to load config file: permission denied\n")
        }));
        let session = RcloneSession::new("", runner).unwrap();

        match session.list_remotes().await {
            Err(ArtifactError::ToolExecution {
                command,
                code,
                stderr,
            }) => {
                assert_eq!(command, "listremotes");
                assert_eq!(code, 1);
                assert_eq!(stderr, "Failed to load config file: permission denied");
            }
            other => panic!("expected tool execution error, got {:?}", other),
        }
    }
}
