//! Browser session acquisition.
//!
//! Finds or launches a Chrome instance with remote debugging enabled and a
//! persistent profile, so the operator's login state survives between runs.
//! Failure here is fatal: nothing else can proceed without a session.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::cdp::{CdpClient, CdpError, PageSession};

/// Errors while acquiring a browser session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no Chrome or Chromium binary found; install Google Chrome")]
    ChromeNotFound,

    #[error("failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Browser configuration.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Remote debugging port.
    pub debug_port: u16,
    /// Profile directory for persistent login state.
    pub profile_dir: Option<PathBuf>,
    /// Run Chrome headless. Assisted login wants a visible window, so
    /// this defaults off.
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            profile_dir: None,
            headless: false,
        }
    }
}

impl BrowserConfig {
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    fn resolved_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".crmigrate").join("browser-profile"))
                .unwrap_or_else(|| PathBuf::from(".crmigrate-profile"))
        })
    }
}

/// A connected browser plus the Chrome process if this run launched it.
pub struct Browser {
    client: CdpClient,
    chrome_process: Option<Child>,
}

impl Browser {
    /// Connect to a running Chrome, launching one when none answers.
    pub async fn acquire(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let mut chrome_process = None;

        if !endpoint_alive(&config.endpoint()).await {
            info!(
                "no browser on port {}, launching Chrome",
                config.debug_port
            );
            let child = launch_chrome(config)?;
            chrome_process = Some(child);

            let mut attempts = 0;
            while attempts < 30 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                if endpoint_alive(&config.endpoint()).await {
                    break;
                }
                attempts += 1;
            }
            if attempts >= 30 {
                return Err(BrowserError::LaunchFailed(
                    "Chrome did not answer on the debug port in time".to_string(),
                ));
            }
        } else {
            info!("reusing browser already on port {}", config.debug_port);
        }

        let client = CdpClient::connect(&config.endpoint()).await?;
        Ok(Self {
            client,
            chrome_process,
        })
    }

    /// The page the run drives: the operator's existing tab when present.
    pub async fn open_page(&self) -> Result<PageSession, BrowserError> {
        Ok(self.client.open_page().await?)
    }

    /// Kill Chrome only if this run launched it.
    pub async fn shutdown(mut self) {
        if let Some(mut child) = self.chrome_process.take() {
            info!("shutting down launched Chrome");
            let _ = child.kill().await;
        }
    }
}

async fn endpoint_alive(endpoint: &str) -> bool {
    reqwest::get(format!("{}/json/version", endpoint)).await.is_ok()
}

/// Find a Chrome/Chromium executable on this machine.
pub fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    paths.into_iter().map(PathBuf::from).find(|p| p.exists())
}

fn launch_chrome(config: &BrowserConfig) -> Result<Child, BrowserError> {
    let chrome_path = find_chrome().ok_or(BrowserError::ChromeNotFound)?;
    let profile_dir = config.resolved_profile_dir();

    if let Err(e) = std::fs::create_dir_all(&profile_dir) {
        warn!("failed to create profile directory: {}", e);
    }

    info!("launching Chrome with profile at {}", profile_dir.display());

    let mut cmd = Command::new(&chrome_path);
    cmd.arg(format!("--remote-debugging-port={}", config.debug_port))
        .arg(format!("--user-data-dir={}", profile_dir.display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-notifications")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--start-maximized")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        // Reap Chrome even when the run aborts before shutdown().
        .kill_on_drop(true);

    if config.headless {
        cmd.arg("--headless=new");
    }

    let child = cmd
        .spawn()
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

    info!("Chrome launched with PID {:?}", child.id());
    Ok(child)
}
