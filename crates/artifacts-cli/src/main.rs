//! rclone-artifacts CLI
//!
//! Store, list and fetch run artifacts on any rclone remote.

mod commands;

use anyhow::Result;
use artifacts_core::{MkdirFailure, ProbeStrategy, RepositoryOptions};
use artifacts_rclone::{create_repository_factory_with, RcloneProvider};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "rclone-artifacts")]
#[command(author, version, about = "Store and fetch run artifacts on an rclone remote", long_about = None)]
struct Cli {
    /// Artifact URI, e.g. rclone://myremote/experiments/42
    uri: String,

    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How listing tells files from directories (stat, dry-run)
    #[arg(long, global = true, default_value = "stat")]
    probe: ProbeStrategy,

    /// Fail instead of warning when a destination directory cannot be created
    #[arg(long, global = true)]
    strict_mkdir: bool,

    /// Timeout for each rclone invocation, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a single file
    Log {
        /// Local file
        file: PathBuf,

        /// Destination directory below the artifact root
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Upload the contents of a directory
    #[command(name = "log-dir")]
    LogDir {
        /// Local directory
        dir: PathBuf,

        /// Destination directory below the artifact root
        #[arg(short, long)]
        path: Option<String>,
    },

    /// List artifacts recursively
    Ls {
        /// Directory below the artifact root
        path: Option<String>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a single file
    Get {
        /// File below the artifact root
        remote_file: String,

        /// Local destination file
        local_path: PathBuf,
    },

    /// Download a directory
    #[command(name = "get-dir")]
    GetDir {
        /// Local destination directory
        local_dir: PathBuf,

        /// Directory below the artifact root
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Delete artifacts (not supported by rclone repositories)
    Rm {
        /// Directory below the artifact root
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "artifacts_cli=debug,artifacts_core=debug,artifacts_rclone=debug"
        } else {
            "artifacts_cli=info,artifacts_rclone=warn"
        })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = run(cli).await;

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut options = RepositoryOptions::from_env()?.with_probe(cli.probe);
    if cli.strict_mkdir {
        options = options.with_mkdir_failure(MkdirFailure::Escalate);
    }
    if let Some(secs) = cli.timeout {
        options = options.with_timeout(Duration::from_secs(secs.max(1)));
    }
    debug!(?options, "Resolved repository options");

    let factory = create_repository_factory_with(RcloneProvider::with_options(options));
    let repo = factory.open(&cli.uri).await?;

    match cli.command {
        Commands::Log { file, path } => commands::log(repo.as_ref(), &file, path.as_deref()).await,
        Commands::LogDir { dir, path } => {
            commands::log_dir(repo.as_ref(), &dir, path.as_deref()).await
        }
        Commands::Ls { path, json } => commands::list(repo.as_ref(), path.as_deref(), json).await,
        Commands::Get {
            remote_file,
            local_path,
        } => commands::get(repo.as_ref(), &remote_file, &local_path).await,
        Commands::GetDir { local_dir, path } => {
            commands::get_dir(repo.as_ref(), path.as_deref(), &local_dir).await
        }
        Commands::Rm { path } => commands::remove(repo.as_ref(), path.as_deref()).await,
    }
}
