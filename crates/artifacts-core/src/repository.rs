//! Artifact repository trait and scheme factory

use crate::error::{ArtifactError, Result};
use crate::types::ArtifactEntry;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Artifact repository trait
///
/// Stores and fetches run artifacts under the base path named by the
/// repository's URI. Every `artifact_path` argument is relative to that base.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// The URI this repository was opened with
    fn artifact_uri(&self) -> &str;

    /// Upload one local file into `artifact_path` (a directory)
    async fn log_artifact(&self, local_file: &Path, artifact_path: Option<&str>) -> Result<()>;

    /// Upload the contents of a local directory into `artifact_path`
    async fn log_artifacts(&self, local_dir: &Path, artifact_path: Option<&str>) -> Result<()>;

    /// List everything under `path`, recursively, in the order the backend reports it
    async fn list_artifacts(&self, path: Option<&str>) -> Result<Vec<ArtifactEntry>>;

    /// Fetch one remote file to the exact local path given
    async fn download_file(&self, remote_file_path: Option<&str>, local_path: &Path)
        -> Result<()>;

    /// Fetch everything under `artifact_path` into `local_dir`
    async fn download_artifacts(
        &self,
        artifact_path: Option<&str>,
        local_dir: &Path,
    ) -> Result<PathBuf>;

    /// Delete artifacts under `artifact_path`
    async fn delete_artifacts(&self, artifact_path: Option<&str>) -> Result<()> {
        Err(ArtifactError::NotImplemented(format!(
            "delete_artifacts({})",
            artifact_path.unwrap_or("<root>")
        )))
    }
}

/// Opens repositories for one URI scheme
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// The scheme this provider handles, e.g. `rclone`
    fn scheme(&self) -> &str;

    async fn open(&self, uri: &str) -> Result<Box<dyn ArtifactRepository>>;
}

/// Repository factory dispatching artifact URIs by scheme
pub struct RepositoryFactory {
    providers: std::collections::HashMap<String, Box<dyn RepositoryProvider>>,
}

impl Default for RepositoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self {
            providers: std::collections::HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one for the same scheme
    pub fn register(&mut self, provider: Box<dyn RepositoryProvider>) {
        self.providers
            .insert(provider.scheme().to_ascii_lowercase(), provider);
    }

    /// Check if a provider is registered for a scheme
    pub fn has(&self, scheme: &str) -> bool {
        self.providers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Get all registered schemes
    pub fn registered_schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Open a repository for `uri` with the provider registered for its scheme
    pub async fn open(&self, uri: &str) -> Result<Box<dyn ArtifactRepository>> {
        let scheme = uri
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| {
                ArtifactError::Configuration(format!("Artifact uri has no scheme: {}", uri))
            })?;

        let provider = self.providers.get(&scheme).ok_or_else(|| {
            ArtifactError::Configuration(format!("No repository registered for scheme '{}'", scheme))
        })?;

        tracing::debug!(scheme = %scheme, uri = %uri, "Opening artifact repository");
        provider.open(uri).await
    }
}
