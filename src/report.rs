use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::query::CompareQuery;

/// Element the dashboard application mounts under; its absence means the
/// page layout changed and nothing can be scraped.
const APP_SELECTOR: &str = "#app";

/// Class carried by every rendered benchmark table.
const TABLE_SELECTOR: &str = ".bench-table";

/// Cells per result row: one expand control followed by eight data columns.
const ROW_CELLS: usize = 9;

/// One row of a comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub profile: String,
    pub scenario: String,
    pub backend: String,
    pub target: String,
    pub change: f64,
    pub significance_threshold: f64,
    pub significance_factor: f64,
}

impl BenchmarkResult {
    /// Build a result from the visible texts of one table row.
    ///
    /// Position 0 is the dashboard's expand control and is skipped; the eight
    /// data columns follow. A shorter row is an error, which abandons the
    /// whole table.
    pub fn parse_from_row(cells: &[String]) -> Result<Self> {
        if cells.len() < ROW_CELLS {
            bail!("row has {} cells, expected {ROW_CELLS}", cells.len());
        }
        Ok(Self {
            name: cells[1].clone(),
            profile: cells[2].clone(),
            scenario: cells[3].clone(),
            backend: cells[4].clone(),
            target: cells[5].clone(),
            change: parse_numeric_cell(&cells[6])?,
            significance_threshold: parse_numeric_cell(&cells[7])?,
            significance_factor: parse_numeric_cell(&cells[8])?,
        })
    }

    /// Whether the observed change magnitude reaches the dashboard's
    /// significance threshold.
    pub fn is_significant(&self) -> bool {
        self.significance_factor >= 1.0
    }
}

/// Parse a numeric cell, dropping the one-character unit suffix the dashboard
/// renders (`%` on change and threshold, `x` on the factor).
fn parse_numeric_cell(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let Some((last, _)) = trimmed.char_indices().next_back() else {
        bail!("empty numeric cell");
    };
    trimmed[..last]
        .parse::<f64>()
        .with_context(|| format!("invalid numeric cell {trimmed:?}"))
}

/// One named dashboard table and the rows parsed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchTable {
    pub name: String,
    pub results: Vec<BenchmarkResult>,
}

/// Everything scraped for one comparison query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub query: CompareQuery,
    pub fetched_at: DateTime<Utc>,
    pub tables: Vec<BenchTable>,
}

impl ComparisonReport {
    /// Parse a rendered dashboard document into a report for `query`.
    pub fn from_html(query: &CompareQuery, html: &str) -> Result<Self> {
        Ok(Self {
            query: query.clone(),
            fetched_at: Utc::now(),
            tables: parse_tables(html)?,
        })
    }

    /// Total result rows across all tables.
    pub fn result_count(&self) -> usize {
        self.tables.iter().map(|table| table.results.len()).sum()
    }

    /// Drop rows whose change does not reach the significance threshold.
    /// Tables are kept even when emptied so the caller still sees which
    /// views the dashboard rendered.
    pub fn retain_significant(&mut self) {
        for table in &mut self.tables {
            table.results.retain(BenchmarkResult::is_significant);
        }
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "comparison {}", self.query)?;
        writeln!(
            f,
            "fetched {}",
            self.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        if self.tables.is_empty() {
            return writeln!(f, "no benchmark tables rendered for this comparison");
        }
        for table in &self.tables {
            writeln!(f)?;
            writeln!(f, "{} [{} results]", table.name, table.results.len())?;
            for result in &table.results {
                writeln!(
                    f,
                    "  {:>+8.2}%  {:<24} {:<8} {:<20} {:<10} {:<14} threshold {:.2}%  factor {:.2}x",
                    result.change,
                    result.name,
                    result.profile,
                    result.scenario,
                    result.backend,
                    result.target,
                    result.significance_threshold,
                    result.significance_factor,
                )?;
            }
        }
        Ok(())
    }
}

/// Extract every benchmark table under the dashboard's `#app` mount point,
/// in DOM order.
///
/// A table that cannot be fully parsed (no body, a short row, an unparsable
/// cell) is logged and skipped; its siblings still contribute. A document
/// without `#app` is a page-level failure and propagates.
pub fn parse_tables(html: &str) -> Result<Vec<BenchTable>> {
    let document = Html::parse_document(html);
    let app_selector = selector(APP_SELECTOR)?;
    let table_selector = selector(TABLE_SELECTOR)?;

    let app = document
        .select(&app_selector)
        .next()
        .context("no `#app` element in page; dashboard layout may have changed")?;

    let mut tables = Vec::new();
    for element in app.select(&table_selector) {
        let name = element.value().attr("id");
        match parse_table(name, element) {
            Ok(table) => {
                debug!(table = %table.name, results = table.results.len(), "parsed table");
                tables.push(table);
            }
            Err(err) => {
                let table = name.unwrap_or("<unnamed>");
                warn!(table = %table, error = %err, "table has no usable results; skipping");
            }
        }
    }
    Ok(tables)
}

fn parse_table(name: Option<&str>, element: ElementRef<'_>) -> Result<BenchTable> {
    let name = name.context("table has no id attribute")?;
    let body_selector = selector("tbody")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let body = element
        .select(&body_selector)
        .next()
        .context("table has no body section")?;

    let mut results = Vec::new();
    for row in body.select(&row_selector) {
        let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();
        results.push(BenchmarkResult::parse_from_row(&cells)?);
    }

    Ok(BenchTable {
        name: name.to_string(),
        results,
    })
}

/// Visible text of one cell: concatenated text nodes with whitespace collapsed.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector `{css}`: {err}"))
}
