//! End-to-end run wiring: source collection, backup, destination migration.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use url::Url;

use crate::backup;
use crate::browser::{Browser, BrowserConfig};
use crate::collect::collect_pages;
use crate::console::{OperatorConsole, StdinConsole};
use crate::dest::AdminDestination;
use crate::migrate::{self, MigrateOptions, RecordStatus, SkipReason};
use crate::model::fold_name;
use crate::source::{DestList, SourceList, dismiss_cookie_banner, extract_all, force_https};

/// One run's configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Custom-results listing URL of the source store.
    pub source_url: String,
    /// Custom-results listing URL of the destination store.
    pub dest_url: String,
    /// Simulate: collect and back up, but create nothing.
    pub dry_run: bool,
    /// Chrome remote debugging port.
    pub debug_port: u16,
    /// Run the browser headless. Assisted login wants it off.
    pub headless: bool,
    /// Directory for the backup artifacts.
    pub backup_dir: PathBuf,
    /// Creation attempts per record.
    pub max_attempts: u32,
    /// Browser profile directory override.
    pub profile_dir: Option<PathBuf>,
}

/// Drive the whole migration.
pub async fn run(config: &RunConfig) -> anyhow::Result<()> {
    let source_url = Url::parse(&force_https(&config.source_url))
        .with_context(|| format!("invalid source URL `{}`", config.source_url))?;
    let dest_url = Url::parse(&force_https(&config.dest_url))
        .with_context(|| format!("invalid destination URL `{}`", config.dest_url))?;

    let browser = Browser::acquire(&BrowserConfig {
        debug_port: config.debug_port,
        profile_dir: config.profile_dir.clone(),
        headless: config.headless,
    })
    .await
    .context("could not open a browser session")?;

    // Shut down a launched Chrome on every exit path, not just success.
    let result = drive(&browser, config, &source_url, &dest_url).await;
    browser.shutdown().await;
    result
}

async fn drive(
    browser: &Browser,
    config: &RunConfig,
    source_url: &Url,
    dest_url: &Url,
) -> anyhow::Result<()> {
    let page = browser.open_page().await?;
    let mut console = StdinConsole;

    // ---- Source: assisted identity collection, then extraction ----
    info!("opening source listing");
    page.navigate(source_url.as_str()).await?;
    dismiss_cookie_banner(&page).await;

    console.notify("");
    console.notify(">>> ASSISTED MODE (SOURCE, page by page) <<<");
    console.notify("1) In the browser: log in if prompted.");
    console.notify("2) On the source list: pick 'Rows per page = 50' or open the page you want.");
    console.notify("3) Come back here and press ENTER to capture the CURRENT page.");
    console.notify("   When all pages are done, type 'fin' and ENTER.");
    console.notify("");

    let identities = collect_pages(
        &mut console,
        &mut SourceList::new(&page),
        "SOURCE",
        |row| row.href.clone(),
    )
    .await?;
    info!("source: {} unique identities collected", identities.len());

    let records = extract_all(&page, &identities)
        .await
        .context("source extraction failed")?;

    backup::write_backups(&config.backup_dir, &records)?;

    // ---- Destination: assisted existing-name collection ----
    info!("opening destination listing");
    page.navigate(dest_url.as_str()).await?;
    dismiss_cookie_banner(&page).await;

    console.notify("");
    console.notify(">>> ASSISTED MODE (DESTINATION, page by page) <<<");
    console.notify("1) In the browser: log in if prompted, show 50 rows if possible.");
    console.notify("2) Press ENTER to capture the CURRENT destination page.");
    console.notify("3) Change pages and press ENTER again. Type 'fin' when done.");
    console.notify("");

    let names = collect_pages(&mut console, &mut DestList::new(&page), "DESTINATION", |n| {
        fold_name(n)
    })
    .await?;
    let existing: HashSet<String> = names.iter().map(|n| fold_name(n)).collect();
    info!("destination: {} unique existing names collected", existing.len());

    // ---- Creation ----
    let mut site = AdminDestination::new(&page, dest_url.as_str());
    let report = migrate::run(
        &mut site,
        &records,
        existing,
        &MigrateOptions {
            max_attempts: config.max_attempts,
            dry_run: config.dry_run,
        },
    )
    .await?;

    info!(
        "migration finished: {} created, {} already existed, {} unnamed, {} dry-run",
        report.created,
        report.count(&RecordStatus::Skipped(SkipReason::AlreadyExists)),
        report.count(&RecordStatus::Skipped(SkipReason::NoName)),
        report.count(&RecordStatus::Skipped(SkipReason::DryRun)),
    );
    for failure in report.failed() {
        info!("  failed: {}", failure.name);
    }

    Ok(())
}
