use std::{fs, path::PathBuf};

use crate::{Dashboard, report::ComparisonReport};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "perfcompare", version, about = "Scrape benchmark comparisons from the rustc perf dashboard", long_about = None)]
pub struct Cli {
    /// Commit hash or tag of the baseline artifact.
    #[arg(value_name = "START")]
    pub start: String,

    /// Commit hash or tag of the artifact to compare against.
    #[arg(value_name = "END")]
    pub end: String,

    /// Statistic to compare (defaults to the configured one).
    #[arg(long, value_name = "STAT")]
    pub stat: Option<String>,

    /// Dashboard tab to scrape (defaults to the configured one).
    #[arg(long, value_name = "TAB")]
    pub tab: Option<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep only rows the dashboard marks significant.
    #[arg(long, action = ArgAction::SetTrue)]
    pub significant_only: bool,

    /// Also save the rendered page HTML for inspection.
    #[arg(long, value_name = "FILE")]
    pub dump_html: Option<PathBuf>,

    /// Override how many seconds to wait for tables to render.
    #[arg(long, value_name = "SECS")]
    pub ready_timeout: Option<u64>,

    /// Run the browser with a visible window.
    #[arg(long, action = ArgAction::SetTrue)]
    pub headful: bool,

    /// Custom config path.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity.
    #[arg(long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

/// How the scraped report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table summary.
    Text,
    /// Pretty-printed JSON document.
    Json,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "perfcompare=debug"
    } else {
        "perfcompare=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut dashboard = Dashboard::bootstrap(cli.config.clone())?;
    if let Some(secs) = cli.ready_timeout {
        dashboard.settings_mut().browser.ready_timeout_secs = secs;
    }
    if cli.headful {
        dashboard.settings_mut().browser.headless = false;
    }

    let query = dashboard.query(&cli.start, &cli.end, cli.stat.as_deref(), cli.tab.as_deref());
    info!(
        base = %dashboard.settings().dashboard.base_url,
        timeout_s = dashboard.settings().browser.ready_timeout_secs,
        "fetching comparison"
    );
    let html = dashboard.fetch_page(&query)?;

    if let Some(path) = &cli.dump_html {
        fs::write(path, &html)
            .with_context(|| format!("failed to save page HTML to {}", path.display()))?;
        info!(path = %path.display(), bytes = html.len(), "saved rendered page");
    }

    let mut report = ComparisonReport::from_html(&query, &html)?;
    if cli.significant_only {
        report.retain_significant();
    }
    info!(
        tables = report.tables.len(),
        results = report.result_count(),
        "parsed comparison"
    );

    let rendered = match cli.format {
        OutputFormat::Text => report.to_string(),
        OutputFormat::Json => {
            let mut encoded = serde_json::to_string_pretty(&report)?;
            encoded.push('\n');
            encoded
        }
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
