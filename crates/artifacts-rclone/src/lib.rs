//! rclone artifact store
//!
//! Stores run artifacts on any remote rclone knows about by driving the
//! `rclone` command line.

mod repository;
mod runner;
mod session;

#[cfg(test)]
mod testing;

pub use repository::RcloneArtifactRepository;
pub use runner::{ProcessRunner, ToolOutput, ToolRunner};
pub use session::{validate_config, RcloneSession};

use artifacts_core::{
    ArtifactRepository, RepositoryFactory, RepositoryOptions, RepositoryProvider, Result,
};
use async_trait::async_trait;

/// URI scheme served by this crate
pub const SCHEME: &str = "rclone";

/// Opens `rclone://` repositories
pub struct RcloneProvider {
    options: Option<RepositoryOptions>,
}

impl RcloneProvider {
    /// Provider that reads its options from the environment on every open
    pub fn new() -> Self {
        Self { options: None }
    }

    /// Provider that opens every repository with the same options
    pub fn with_options(options: RepositoryOptions) -> Self {
        Self {
            options: Some(options),
        }
    }
}

impl Default for RcloneProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryProvider for RcloneProvider {
    fn scheme(&self) -> &str {
        SCHEME
    }

    async fn open(&self, uri: &str) -> Result<Box<dyn ArtifactRepository>> {
        let options = match self.options {
            Some(ref options) => options.clone(),
            None => RepositoryOptions::from_env()?,
        };
        let repo = RcloneArtifactRepository::open_with_options(uri, options).await?;
        Ok(Box::new(repo))
    }
}

/// Create a repository factory with the rclone provider registered
pub fn create_repository_factory() -> RepositoryFactory {
    create_repository_factory_with(RcloneProvider::new())
}

/// Create a repository factory around a preconfigured rclone provider
pub fn create_repository_factory_with(provider: RcloneProvider) -> RepositoryFactory {
    let mut factory = RepositoryFactory::new();
    factory.register(Box::new(provider));
    factory
}
