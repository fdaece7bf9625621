use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BrowserSettings;

/// Environment override for the browser binary.
pub const BROWSER_ENV: &str = "PERFCOMPARE_BROWSER_BINARY";

/// Marker polled after navigation; present once the dashboard has rendered
/// at least one benchmark table.
pub const READY_SELECTOR: &str = "#app .bench-table";

const BROWSER_CANDIDATES: [&str; 6] = [
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
    "chrome",
    "brave",
];

/// One headless Chromium instance. The process is torn down when the
/// session is dropped.
pub struct HeadlessSession {
    browser: Browser,
    ready_timeout: Duration,
}

impl HeadlessSession {
    /// Launch a browser according to `settings`.
    pub fn launch(settings: &BrowserSettings) -> Result<Self> {
        let binary = resolve_browser_binary(settings)?;
        info!(
            binary = %binary.display(),
            headless = settings.headless,
            "launching browser"
        );

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .path(Some(binary))
            .window_size(Some((settings.window_width, settings.window_height)))
            // Idle reaper must outlast the readiness wait.
            .idle_browser_timeout(Duration::from_secs(
                settings.ready_timeout_secs.saturating_add(60),
            ))
            .build()
            .map_err(|err| anyhow!("failed to assemble browser launch options: {err}"))?;

        let browser = Browser::new(options).context("failed to launch headless browser")?;
        Ok(Self {
            browser,
            ready_timeout: Duration::from_secs(settings.ready_timeout_secs),
        })
    }

    /// Navigate to `url` and return the page HTML once the dashboard has
    /// rendered, or once the readiness timeout passes.
    ///
    /// A timeout is not an error: a comparison with no data never renders a
    /// table, and the caller still wants the page to prove it.
    pub fn render(&self, url: &Url) -> Result<String> {
        let tab = self.browser.new_tab().context("failed to open a browser tab")?;

        info!(url = %url, "navigating to comparison page");
        tab.navigate_to(url.as_str())
            .with_context(|| format!("failed to navigate to {url}"))?;
        tab.wait_until_navigated()
            .context("page never finished loading")?;

        match tab.wait_for_element_with_custom_timeout(READY_SELECTOR, self.ready_timeout) {
            Ok(_) => debug!("benchmark tables rendered"),
            Err(err) => warn!(
                error = %err,
                timeout_s = self.ready_timeout.as_secs(),
                "no benchmark table appeared before the timeout; the comparison may be empty"
            ),
        }

        tab.get_content().context("failed to read the rendered page")
    }
}

/// Locate a Chromium-compatible binary: explicit config first, then the
/// environment override, then well-known names on `PATH`.
fn resolve_browser_binary(settings: &BrowserSettings) -> Result<PathBuf> {
    if let Some(path) = &settings.binary_path {
        return Ok(path.clone());
    }
    if let Ok(path) = env::var(BROWSER_ENV) {
        return Ok(PathBuf::from(path));
    }
    for candidate in BROWSER_CANDIDATES {
        if let Ok(path) = which::which(candidate) {
            return Ok(path);
        }
    }
    bail!("Chromium-compatible binary not found; set {BROWSER_ENV} or configure browser.binary_path")
}
