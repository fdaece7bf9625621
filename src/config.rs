use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Where the comparison dashboard lives and which view to ask it for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Base URL of the comparison page; query parameters are replaced per run.
    pub base_url: String,
    /// Statistic requested when the command line does not name one.
    pub default_stat: String,
    /// Dashboard tab requested when the command line does not name one.
    pub default_tab: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            base_url: String::from("https://perf.rust-lang.org/compare.html"),
            default_stat: String::from("instructions:u"),
            default_tab: String::from("compile"),
        }
    }
}

/// How the headless browser is located and driven.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Explicit Chromium binary; discovery runs when unset.
    pub binary_path: Option<PathBuf>,
    pub headless: bool,
    /// How long to wait for the dashboard to render its tables.
    pub ready_timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            binary_path: None,
            headless: true,
            ready_timeout_secs: 30,
            window_width: 1600,
            window_height: 1200,
        }
    }
}

/// Root of the on-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dashboard: DashboardSettings,
    pub browser: BrowserSettings,
}

impl Settings {
    /// Load settings from disk, writing defaults if missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Unable to read config at {}", path.display()))?;
            let parsed: Self = toml::from_str(&raw)
                .with_context(|| format!("Malformed config at {}", path.display()))?;
            Ok(parsed)
        } else {
            let settings = Self::default();
            settings.save(path)?;
            Ok(settings)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let serialised = toml::to_string_pretty(self)?;
        fs::write(path, serialised)
            .with_context(|| format!("Failed to persist config to {}", path.display()))
    }
}

/// Compute the default path to the configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "perfcompare", "perfcompare")
        .context("Unable to resolve platform config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let settings = Settings::load_or_default(&path).expect("load");
        assert!(path.exists());
        assert_eq!(
            settings.dashboard.base_url,
            "https://perf.rust-lang.org/compare.html"
        );
        assert_eq!(settings.dashboard.default_stat, "instructions:u");
        assert_eq!(settings.dashboard.default_tab, "compile");
        assert!(settings.browser.headless);
        assert_eq!(settings.browser.ready_timeout_secs, 30);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[dashboard]\ndefault_stat = \"cycles:u\"\n").expect("write");

        let settings = Settings::load_or_default(&path).expect("load");
        assert_eq!(settings.dashboard.default_stat, "cycles:u");
        assert_eq!(settings.dashboard.default_tab, "compile");
        assert!(settings.browser.binary_path.is_none());
        assert_eq!(settings.browser.window_width, 1600);
    }

    #[test]
    fn saved_settings_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.dashboard.default_tab = String::from("runtime");
        settings.browser.ready_timeout_secs = 5;
        settings.browser.binary_path = Some(PathBuf::from("/usr/bin/chromium"));
        settings.save(&path).expect("save");

        let loaded = Settings::load_or_default(&path).expect("load");
        assert_eq!(loaded.dashboard.default_tab, "runtime");
        assert_eq!(loaded.browser.ready_timeout_secs, 5);
        assert_eq!(
            loaded.browser.binary_path.as_deref(),
            Some(Path::new("/usr/bin/chromium"))
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "dashboard = \"not a table\"\n").expect("write");

        assert!(Settings::load_or_default(&path).is_err());
    }
}
