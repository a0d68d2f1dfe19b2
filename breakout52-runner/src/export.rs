//! Artifact export: JSON, CSV and Markdown files for one run.
//!
//! Every run gets a directory named by its fingerprint under the output
//! directory:
//! - `manifest.json`: schema version, fingerprint, config, data provenance
//! - `equity.csv`: daily portfolio state and benchmark close
//! - `trades.csv`: closed trades in close order
//! - `monthly.csv`: month-start rows with holdings and blocked tickers
//! - `monthly_returns.csv`: month-over-month returns
//! - `blocked.csv`: every date with unfunded breakouts
//! - `open_positions.csv`: positions still held at the end
//! - `report.json`: the full performance report
//! - `report.md`: human-readable summary
//!
//! Persisted manifests carry `schema_version`; newer versions are rejected on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use breakout52_core::data::DataSource;
use breakout52_core::{BlockedEntries, PortfolioState, Position, RunFingerprint, Trade};
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::reporting::{MarkdownReportGenerator, MonthlyReturn, MonthlyRow, RunSummary};
use crate::runner::{BacktestRun, SCHEMA_VERSION};

/// Small descriptor of a run; the heavy data lives in the CSV files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub fingerprint: RunFingerprint,
    pub config: BacktestConfig,
    pub data_sources: BTreeMap<String, DataSource>,
    pub has_synthetic: bool,
    pub summary: RunSummary,
}

impl RunManifest {
    pub fn from_run(run: &BacktestRun) -> Self {
        Self {
            schema_version: run.schema_version,
            run_id: run.run_id().to_string(),
            created_at: chrono::Utc::now(),
            fingerprint: run.result.fingerprint.clone(),
            config: run.config.clone(),
            data_sources: run.data_sources.clone(),
            has_synthetic: run.has_synthetic,
            summary: run.report.summary.clone(),
        }
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_default()
}

/// Daily portfolio state. `benchmark_closes` is aligned to the snapshots.
pub fn export_equity_csv(
    snapshots: &[PortfolioState],
    benchmark_closes: &[Option<f64>],
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "cash",
        "invested_value",
        "total_value",
        "total_value_ex_commission",
        "num_holdings",
        "benchmark_close",
    ])?;
    for (i, s) in snapshots.iter().enumerate() {
        wtr.write_record([
            &s.date.to_string(),
            &format!("{:.6}", s.cash),
            &format!("{:.6}", s.invested_value),
            &format!("{:.6}", s.total_value),
            &format!("{:.6}", s.total_value_ex_commission),
            &s.num_holdings().to_string(),
            &opt(benchmark_closes.get(i).copied().flatten(), 4),
        ])?;
    }
    finish(wtr)
}

pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "ticker",
        "entry_date",
        "entry_price",
        "entry_amount",
        "shares",
        "exit_date",
        "exit_price",
        "exit_amount",
        "return_pct",
        "entry_commission",
        "exit_commission",
        "total_commission",
        "net_pnl",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.ticker,
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.entry_amount),
            &format!("{:.8}", t.shares),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.exit_amount),
            &format!("{:.4}", t.return_pct),
            &format!("{:.6}", t.entry_commission),
            &format!("{:.6}", t.exit_commission),
            &format!("{:.6}", t.total_commission),
            &format!("{:.6}", t.net_pnl()),
        ])?;
    }
    finish(wtr)
}

/// Ticker lists are space-separated within a single field.
pub fn export_monthly_csv(rows: &[MonthlyRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "cash",
        "invested_value",
        "total_value",
        "total_value_ex_commission",
        "benchmark_value",
        "num_holdings",
        "holdings",
        "blocked",
    ])?;
    for r in rows {
        wtr.write_record([
            &r.date.to_string(),
            &format!("{:.6}", r.cash),
            &format!("{:.6}", r.invested_value),
            &format!("{:.6}", r.total_value),
            &format!("{:.6}", r.total_value_ex_commission),
            &opt(r.benchmark_value, 4),
            &r.num_holdings().to_string(),
            &r.holdings.join(" "),
            &r.blocked.join(" "),
        ])?;
    }
    finish(wtr)
}

pub fn export_monthly_returns_csv(returns: &[MonthlyReturn]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["year", "month", "portfolio_pct", "benchmark_pct"])?;
    for r in returns {
        wtr.write_record([
            &r.year.to_string(),
            &r.month.to_string(),
            &opt(r.portfolio_pct, 4),
            &opt(r.benchmark_pct, 4),
        ])?;
    }
    finish(wtr)
}

/// One row per (date, ticker); days with nothing blocked are omitted.
pub fn export_blocked_csv(blocked: &[BlockedEntries]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "ticker"])?;
    for day in blocked {
        for ticker in &day.tickers {
            wtr.write_record([&day.date.to_string(), ticker])?;
        }
    }
    finish(wtr)
}

pub fn export_open_positions_csv(positions: &[Position]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "ticker",
        "entry_date",
        "entry_price",
        "entry_amount",
        "shares",
        "entry_commission",
    ])?;
    for p in positions {
        wtr.write_record([
            &p.ticker,
            &p.entry_date.to_string(),
            &format!("{:.6}", p.entry_price),
            &format!("{:.6}", p.entry_amount),
            &format!("{:.8}", p.shares),
            &format!("{:.6}", p.entry_commission),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set under `output_dir/{run_id}/`.
///
/// `benchmark_closes` is the forward-filled benchmark aligned to the run's
/// calendar (pass an empty slice to leave the column blank). Returns the
/// run directory.
pub fn save_artifacts(
    run: &BacktestRun,
    benchmark_closes: &[Option<f64>],
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(run.run_id());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest = serde_json::to_string_pretty(&RunManifest::from_run(run))
        .context("failed to serialize run manifest")?;
    write(&run_dir, "manifest.json", &manifest)?;

    let result = &run.result;
    write(
        &run_dir,
        "equity.csv",
        &export_equity_csv(&result.snapshots, benchmark_closes)?,
    )?;
    write(&run_dir, "trades.csv", &export_trades_csv(&result.trades)?)?;
    write(
        &run_dir,
        "monthly.csv",
        &export_monthly_csv(&run.report.monthly)?,
    )?;
    write(
        &run_dir,
        "monthly_returns.csv",
        &export_monthly_returns_csv(&run.report.monthly_returns)?,
    )?;
    write(&run_dir, "blocked.csv", &export_blocked_csv(&result.blocked)?)?;
    write(
        &run_dir,
        "open_positions.csv",
        &export_open_positions_csv(&result.open_positions)?,
    )?;

    let report = serde_json::to_string_pretty(&run.report)
        .context("failed to serialize performance report")?;
    write(&run_dir, "report.json", &report)?;
    write(
        &run_dir,
        "report.md",
        &MarkdownReportGenerator.generate(&run.report),
    )?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Read `manifest.json` from an artifact directory, rejecting newer schema versions.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("failed to deserialize run manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}
