//! Command implementations

use anyhow::{Context, Result};
use artifacts_core::{ArtifactEntry, ArtifactRepository};
use colored::Colorize;
use std::path::Path;
use tracing::info;

pub async fn log(repo: &dyn ArtifactRepository, file: &Path, path: Option<&str>) -> Result<()> {
    repo.log_artifact(file, path)
        .await
        .with_context(|| format!("Failed to log {}", file.display()))?;

    info!("Logged {} to {}", file.display(), destination(repo, path));
    println!("{} {}", "✓".green(), file.display());
    Ok(())
}

pub async fn log_dir(repo: &dyn ArtifactRepository, dir: &Path, path: Option<&str>) -> Result<()> {
    repo.log_artifacts(dir, path)
        .await
        .with_context(|| format!("Failed to log directory {}", dir.display()))?;

    info!("Logged {} to {}", dir.display(), destination(repo, path));
    println!("{} {}", "✓".green(), dir.display());
    Ok(())
}

pub async fn list(repo: &dyn ArtifactRepository, path: Option<&str>, json: bool) -> Result<()> {
    let entries = repo.list_artifacts(path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No artifacts found".dimmed());
        return Ok(());
    }

    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub async fn get(repo: &dyn ArtifactRepository, remote_file: &str, local_path: &Path) -> Result<()> {
    repo.download_file(Some(remote_file), local_path)
        .await
        .with_context(|| format!("Failed to download {}", remote_file))?;

    println!("{} {}", "✓".green(), local_path.display());
    Ok(())
}

pub async fn get_dir(
    repo: &dyn ArtifactRepository,
    path: Option<&str>,
    local_dir: &Path,
) -> Result<()> {
    let local = repo.download_artifacts(path, local_dir).await?;

    println!("{} {}", "✓".green(), local.display());
    Ok(())
}

pub async fn remove(repo: &dyn ArtifactRepository, path: Option<&str>) -> Result<()> {
    repo.delete_artifacts(path).await?;
    Ok(())
}

fn destination(repo: &dyn ArtifactRepository, path: Option<&str>) -> String {
    match path {
        Some(path) => format!("{}/{}", repo.artifact_uri().trim_end_matches('/'), path),
        None => repo.artifact_uri().to_string(),
    }
}

/// One listing line: kind marker, size column, path
fn format_entry(entry: &ArtifactEntry) -> String {
    if entry.is_directory {
        format!("d {:>12}  {}/", "-", entry.path)
    } else {
        let size = entry
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("f {:>12}  {}", size, entry.path)
    }
}
