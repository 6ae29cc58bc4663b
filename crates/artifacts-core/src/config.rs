//! Configuration for artifact repositories

use crate::error::{ArtifactError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the rclone config file location
pub const CONFIG_FILE_ENV: &str = "MLFLOW_RCLONE_CONF_FILE";

/// Environment variable overriding the rclone binary
pub const RCLONE_BIN_ENV: &str = "RCLONE_ARTIFACTS_BIN";

/// Environment variable overriding the per-invocation timeout, in seconds
pub const TIMEOUT_ENV: &str = "RCLONE_ARTIFACTS_TIMEOUT_SECS";

pub const DEFAULT_RCLONE_BIN: &str = "rclone";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How listing decides whether an entry is a file or a directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// `lsjson --stat`: tri-state answer with size and modification time
    #[default]
    Stat,
    /// `rmdir --dry-run` heuristic.
    ///
    /// Success means "directory". Failure covers files, missing paths and,
    /// on some rclone versions, non-empty directories, so a `false` answer is
    /// best-effort only.
    DryRunRmdir,
}

impl ProbeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStrategy::Stat => "stat",
            ProbeStrategy::DryRunRmdir => "dry-run",
        }
    }
}

impl std::str::FromStr for ProbeStrategy {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stat" => Ok(ProbeStrategy::Stat),
            "dry-run" | "dry-run-rmdir" => Ok(ProbeStrategy::DryRunRmdir),
            other => Err(ArtifactError::Configuration(format!(
                "Unknown probe strategy: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do when creating a destination directory fails before a copy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MkdirFailure {
    /// Log a warning and let the copy decide
    #[default]
    Warn,
    /// Return the failure to the caller
    Escalate,
}

/// Options for opening a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Explicit config file; `None` means resolve from the environment
    pub config_path: Option<PathBuf>,
    pub rclone_bin: PathBuf,
    /// Upper bound for every single rclone invocation
    pub timeout: Duration,
    pub probe: ProbeStrategy,
    pub mkdir_failure: MkdirFailure,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            rclone_bin: PathBuf::from(DEFAULT_RCLONE_BIN),
            timeout: DEFAULT_TIMEOUT,
            probe: ProbeStrategy::default(),
            mkdir_failure: MkdirFailure::default(),
        }
    }
}

impl RepositoryOptions {
    /// Defaults, with overrides picked up from the process environment
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Some(path) = std::env::var_os(CONFIG_FILE_ENV) {
            options.config_path = Some(PathBuf::from(path));
        }

        if let Some(bin) = std::env::var_os(RCLONE_BIN_ENV) {
            options.rclone_bin = PathBuf::from(bin);
        }

        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            options.timeout = parse_timeout(&secs)?;
        }

        Ok(options)
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_probe(mut self, probe: ProbeStrategy) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_mkdir_failure(mut self, mkdir_failure: MkdirFailure) -> Self {
        self.mkdir_failure = mkdir_failure;
        self
    }

    /// The config file this repository will read
    pub fn resolved_config_path(&self) -> Result<PathBuf> {
        match self.config_path {
            Some(ref path) => Ok(path.clone()),
            None => resolve_config_path(std::env::var_os(CONFIG_FILE_ENV), dirs::home_dir()),
        }
    }
}

fn parse_timeout(secs: &str) -> Result<Duration> {
    let secs: u64 = secs.trim().parse().map_err(|_| {
        ArtifactError::Configuration(format!("{} must be a whole number of seconds", TIMEOUT_ENV))
    })?;
    if secs == 0 {
        return Err(ArtifactError::Configuration(format!(
            "{} must be greater than zero",
            TIMEOUT_ENV
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Resolve the rclone config location: explicit override first, then
/// `<home>/.config/rclone/rclone.conf`.
pub fn resolve_config_path(
    override_path: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let home = home.ok_or_else(|| {
        ArtifactError::Configuration("Could not find home directory".to_string())
    })?;
    Ok(home.join(".config").join("rclone").join("rclone.conf"))
}

/// Read the whole config file as text
pub fn read_config_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ArtifactError::Configuration(format!(
            "Failed to read rclone config from {}: {}",
            path.display(),
            e
        ))
    })
}
