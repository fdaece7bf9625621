pub mod browser;
pub mod cli;
pub mod config;
pub mod query;
pub mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

use crate::browser::HeadlessSession;
use crate::config::{Settings, default_config_path};
use crate::query::CompareQuery;
use crate::report::ComparisonReport;

/// Primary orchestrator: owns the settings and drives one comparison fetch
/// end to end.
pub struct Dashboard {
    settings: Settings,
}

impl Dashboard {
    /// Construct a dashboard client from explicit settings.
    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    /// Load settings from the given path, or from the default location,
    /// writing defaults on first run.
    pub fn bootstrap(config_path_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path_override {
            Some(path) => path,
            None => default_config_path()?,
        };
        let settings = Settings::load_or_default(&config_path)?;
        info!(path = %config_path.display(), "using config");
        Ok(Self::from_settings(settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Build the query for two artifacts, falling back to the configured
    /// statistic and tab when the caller names none.
    pub fn query(
        &self,
        start: &str,
        end: &str,
        stat: Option<&str>,
        tab: Option<&str>,
    ) -> CompareQuery {
        CompareQuery::new(
            start,
            end,
            stat.unwrap_or(&self.settings.dashboard.default_stat),
            tab.unwrap_or(&self.settings.dashboard.default_tab),
        )
    }

    /// Fetch and parse the comparison for `query`.
    pub fn fetch(&self, query: &CompareQuery) -> Result<ComparisonReport> {
        let html = self.fetch_page(query)?;
        ComparisonReport::from_html(query, &html)
    }

    /// Fetch the rendered page HTML for `query` without parsing it.
    pub fn fetch_page(&self, query: &CompareQuery) -> Result<String> {
        let base = Url::parse(&self.settings.dashboard.base_url).with_context(|| {
            format!(
                "invalid dashboard base URL {:?}",
                self.settings.dashboard.base_url
            )
        })?;
        let url = query.to_url(&base);
        let session = HeadlessSession::launch(&self.settings.browser)?;
        session.render(&url)
    }
}
