//! crmigrate - assisted custom-results migration CLI.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crmigrate::app::{self, RunConfig};

/// Migrate custom results from one admin store to another by driving a
/// browser, with operator-assisted pagination.
#[derive(Parser)]
#[command(name = "crmigrate")]
#[command(about = "Assisted browser migration of custom search results between admin stores")]
#[command(version)]
struct Cli {
    /// Custom-results listing URL of the SOURCE store
    #[arg(long, env = "CRMIGRATE_SOURCE_URL")]
    source_url: String,

    /// Custom-results listing URL of the DESTINATION store
    #[arg(long, env = "CRMIGRATE_DEST_URL")]
    dest_url: String,

    /// Simulate only: collect and back up, but create nothing
    #[arg(long)]
    dry_run: bool,

    /// Chrome remote debugging port
    #[arg(long, default_value_t = 9222)]
    debug_port: u16,

    /// Run the browser headless (assisted login wants a visible window)
    #[arg(long)]
    headless: bool,

    /// Directory for the backup artifacts
    #[arg(long, default_value = ".")]
    backup_dir: PathBuf,

    /// Creation attempts per record before giving up on it
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Browser profile directory (default: ~/.crmigrate/browser-profile)
    #[arg(long)]
    profile_dir: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = RunConfig {
        source_url: cli.source_url,
        dest_url: cli.dest_url,
        dry_run: cli.dry_run,
        debug_port: cli.debug_port,
        headless: cli.headless,
        backup_dir: cli.backup_dir,
        max_attempts: cli.max_attempts,
        profile_dir: cli.profile_dir,
    };

    app::run(&config).await
}
