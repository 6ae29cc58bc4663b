//! rclone-backed artifact repository
//!
//! Every operation maps onto one or a few rclone subcommands:
//! - `log_artifact` / `log_artifacts` - `mkdir` then `copy`
//! - `list_artifacts` - `lsf --recursive`, then one probe per entry
//! - `download_file` - `copyto`
//! - `download_artifacts` - `copy` from the remote

use crate::runner::{ProcessRunner, ToolRunner};
use crate::session::RcloneSession;
use artifacts_core::utils::join_path;
use artifacts_core::{
    read_config_payload, ArtifactEntry, ArtifactError, ArtifactRepository, EntryKind, EntryStat,
    MkdirFailure, ProbeStrategy, RemoteRef, RepositoryOptions, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// rclone exit code for "directory not found"
const EXIT_DIR_NOT_FOUND: i32 = 3;
/// rclone exit code for "file not found"
const EXIT_FILE_NOT_FOUND: i32 = 4;

/// `rclone size --json` output
#[derive(Debug, Deserialize)]
struct SizeReport {
    count: u64,
    /// -1 when the backend cannot tell
    bytes: i64,
}

/// One object from `rclone lsjson`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsJsonItem {
    #[serde(default)]
    size: i64,
    #[serde(default)]
    mod_time: Option<DateTime<Utc>>,
    #[serde(default)]
    is_dir: bool,
}

/// Artifact repository stored on an rclone remote
pub struct RcloneArtifactRepository {
    uri: String,
    remote: RemoteRef,
    session: RcloneSession,
    probe: ProbeStrategy,
    mkdir_failure: MkdirFailure,
}

impl RcloneArtifactRepository {
    /// Open `uri` with options taken from the environment and the real rclone binary
    pub async fn open(uri: &str) -> Result<Self> {
        Self::open_with_options(uri, RepositoryOptions::from_env()?).await
    }

    pub async fn open_with_options(uri: &str, options: RepositoryOptions) -> Result<Self> {
        let runner = Arc::new(ProcessRunner::new(&options.rclone_bin, options.timeout));
        Self::open_with(uri, options, runner).await
    }

    /// Open `uri`, running rclone through `runner`.
    ///
    /// The URI is checked before anything is read or run; the remote must be
    /// listed by `rclone listremotes`.
    pub async fn open_with(
        uri: &str,
        options: RepositoryOptions,
        runner: Arc<dyn ToolRunner>,
    ) -> Result<Self> {
        let remote = RemoteRef::parse(uri)?;

        let config_path = options.resolved_config_path()?;
        let payload = read_config_payload(&config_path)?;
        let session = RcloneSession::new(&payload, runner)?;

        let remotes = session.list_remotes().await?;
        if !remotes.contains(&remote.listing_name()) {
            return Err(ArtifactError::Configuration(format!(
                "{} not found in remotes",
                remote.remote
            )));
        }

        info!(
            remote = %remote.remote,
            path = %remote.path,
            config = %config_path.display(),
            probe = %options.probe,
            "Opened rclone artifact repository"
        );

        Ok(Self {
            uri: uri.to_string(),
            remote,
            session,
            probe: options.probe,
            mkdir_failure: options.mkdir_failure,
        })
    }

    pub fn remote(&self) -> &RemoteRef {
        &self.remote
    }

    fn spec_arg(&self, path: &str) -> OsString {
        OsString::from(self.remote.spec(path))
    }

    /// Directory heuristic: `rmdir --dry-run` succeeds only for directories.
    ///
    /// `false` means "file, missing, or a directory rclone refused to
    /// consider removable"; use [`Self::stat`] where a definite answer matters.
    pub async fn is_dir(&self, path: &str) -> Result<bool> {
        let output = self
            .session
            .run("rmdir", &[OsString::from("--dry-run"), self.spec_arg(path)])
            .await?;
        Ok(output.success())
    }

    /// Tri-state lookup through `lsjson --stat`
    pub async fn stat(&self, path: &str) -> Result<EntryStat> {
        let output = self
            .session
            .run("lsjson", &[OsString::from("--stat"), self.spec_arg(path)])
            .await?;

        match output.code {
            0 => {}
            EXIT_DIR_NOT_FOUND | EXIT_FILE_NOT_FOUND => return Ok(EntryStat::absent()),
            code => return Err(ArtifactError::tool_execution("lsjson", code, output.stderr)),
        }

        let item: LsJsonItem = serde_json::from_slice(&output.stdout)?;
        let stat = if item.is_dir {
            EntryStat {
                kind: EntryKind::Directory,
                size: None,
                modified_at: item.mod_time,
            }
        } else {
            EntryStat {
                kind: EntryKind::File,
                size: u64::try_from(item.size).ok(),
                modified_at: item.mod_time,
            }
        };
        Ok(stat)
    }

    /// Create `path` on the remote; already existing is fine
    pub async fn ensure_dir(&self, path: &str) -> Result<()> {
        let output = self.session.run("mkdir", &[self.spec_arg(path)]).await?;
        if output.success() {
            return Ok(());
        }

        match self.mkdir_failure {
            MkdirFailure::Warn => {
                warn!(
                    remote = %self.remote.remote,
                    path,
                    code = output.code,
                    stderr = %output.stderr.trim_end(),
                    "Failed to create artifact directory, continuing"
                );
                Ok(())
            }
            MkdirFailure::Escalate => Err(ArtifactError::tool_execution(
                "mkdir",
                output.code,
                output.stderr,
            )),
        }
    }

    /// Byte size of exactly one object
    pub async fn size(&self, path: &str) -> Result<u64> {
        let output = self
            .session
            .run_checked("size", &[OsString::from("--json"), self.spec_arg(path)])
            .await?;
        let report: SizeReport = serde_json::from_slice(&output.stdout)?;

        if report.count != 1 {
            return Err(ArtifactError::InvalidState(format!(
                "Illegal number of files: {}",
                report.count
            )));
        }

        u64::try_from(report.bytes).map_err(|_| {
            ArtifactError::InvalidState(format!(
                "rclone could not determine the size of {}",
                self.remote.spec(path)
            ))
        })
    }

    async fn describe(&self, path: String) -> Result<ArtifactEntry> {
        match self.probe {
            ProbeStrategy::DryRunRmdir => {
                if self.is_dir(&path).await? {
                    Ok(ArtifactEntry::directory(path))
                } else {
                    let size = self.size(&path).await?;
                    Ok(ArtifactEntry::file(path, size))
                }
            }
            ProbeStrategy::Stat => {
                let stat = self.stat(&path).await?;
                match stat.kind {
                    EntryKind::Directory => {
                        Ok(ArtifactEntry::directory(path).with_modified_at(stat.modified_at))
                    }
                    EntryKind::File => {
                        let size = stat.size.ok_or_else(|| {
                            ArtifactError::InvalidState(format!(
                                "rclone could not determine the size of {}",
                                self.remote.spec(&path)
                            ))
                        })?;
                        Ok(ArtifactEntry::file(path, size).with_modified_at(stat.modified_at))
                    }
                    EntryKind::Absent => Err(ArtifactError::InvalidState(format!(
                        "{} was listed but no longer exists",
                        self.remote.spec(&path)
                    ))),
                }
            }
        }
    }

    async fn copy(&self, command: &str, source: OsString, dest: OsString) -> Result<()> {
        self.session.run_checked(command, &[source, dest]).await?;
        Ok(())
    }
}

/// A local path as an rclone argument; a leading `-` gets a `./` prefix so
/// rclone never reads the path as a flag
fn local_arg(path: &Path) -> OsString {
    if path.as_os_str().as_encoded_bytes().starts_with(b"-") {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_owned()
    }
}

/// Names from `lsf` output, in order, without the trailing `/` on directories
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('/').to_string())
        .collect()
}

#[async_trait]
impl ArtifactRepository for RcloneArtifactRepository {
    fn artifact_uri(&self) -> &str {
        &self.uri
    }

    async fn log_artifact(&self, local_file: &Path, artifact_path: Option<&str>) -> Result<()> {
        let artifact_dir = self.remote.resolve(artifact_path);
        debug!(file = %local_file.display(), dest = %artifact_dir, "Logging artifact");

        self.ensure_dir(&artifact_dir).await?;
        self.copy(
            "copy",
            local_arg(local_file),
            self.spec_arg(&artifact_dir),
        )
        .await
    }

    async fn log_artifacts(&self, local_dir: &Path, artifact_path: Option<&str>) -> Result<()> {
        let dest_path = self.remote.resolve(artifact_path);
        let local_dir = std::path::absolute(local_dir)?;
        debug!(dir = %local_dir.display(), dest = %dest_path, "Logging artifact directory");

        self.ensure_dir(&dest_path).await?;
        self.copy(
            "copy",
            local_arg(&local_dir),
            self.spec_arg(&dest_path),
        )
        .await
    }

    async fn list_artifacts(&self, path: Option<&str>) -> Result<Vec<ArtifactEntry>> {
        let list_dir = self.remote.resolve(path);
        let output = self
            .session
            .run(
                "lsf",
                &[OsString::from("--recursive"), self.spec_arg(&list_dir)],
            )
            .await?;

        if !output.success() {
            debug!(
                path = %list_dir,
                code = output.code,
                stderr = %output.stderr.trim_end(),
                "Listing failed, treating as empty"
            );
            return Ok(Vec::new());
        }

        let names = parse_listing(&output.stdout_text());
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let full_path = join_path(&list_dir, Some(&name));
            entries.push(self.describe(full_path).await?);
        }

        Ok(entries)
    }

    async fn download_file(
        &self,
        remote_file_path: Option<&str>,
        local_path: &Path,
    ) -> Result<()> {
        let remote_full_path = self.remote.resolve(remote_file_path);
        debug!(source = %remote_full_path, dest = %local_path.display(), "Downloading artifact");

        self.copy(
            "copyto",
            self.spec_arg(&remote_full_path),
            local_arg(local_path),
        )
        .await
    }

    async fn download_artifacts(
        &self,
        artifact_path: Option<&str>,
        local_dir: &Path,
    ) -> Result<PathBuf> {
        let source = self.remote.resolve(artifact_path);
        debug!(source = %source, dest = %local_dir.display(), "Downloading artifacts");

        self.copy(
            "copy",
            self.spec_arg(&source),
            local_arg(local_dir),
        )
        .await?;
        Ok(local_dir.to_path_buf())
    }

    async fn delete_artifacts(&self, artifact_path: Option<&str>) -> Result<()> {
        Err(ArtifactError::NotImplemented(format!(
            "rclone artifact repository cannot delete {}",
            self.remote.spec(&self.remote.resolve(artifact_path))
        )))
    }
}
