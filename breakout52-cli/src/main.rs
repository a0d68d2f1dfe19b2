//! Breakout52 CLI: download, run, and cache management commands.
//!
//! Commands:
//! - `download`: fetch market data from Yahoo Finance and cache as Parquet
//! - `run`: execute the 52-week breakout backtest and save artifacts
//! - `cache status`: report cache size, symbol count, date ranges
//! - `cache clean`: remove symbols cached longer ago than a cutoff

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use breakout52_core::data::{
    download_symbols, CacheMeta, CircuitBreaker, DataProvider, ParquetCache, StdoutProgress,
    YahooProvider,
};
use breakout52_core::Trade;
use breakout52_runner::reporting::{pivot_by_year, DrawdownPoint, MonthlyReturn};
use breakout52_runner::{
    load_market_data, run_backtest_from_data, save_artifacts, BacktestConfig, BacktestRun,
    LoadOptions,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "breakout52",
    about = "Breakout52 CLI: 52-week high breakout momentum backtester"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download market data from Yahoo Finance and cache as Parquet.
    Download {
        /// Symbols to download (e.g., AAPL MSFT ^DJI).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Run the breakout backtest.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ticker universe, overriding the config (comma-separated or repeated).
        #[arg(long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,

        /// Benchmark symbol, overriding the config.
        #[arg(long)]
        benchmark: Option<String>,

        /// Start date (YYYY-MM-DD), overriding the config.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, inclusive), overriding the config.
        #[arg(long)]
        end: Option<String>,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cache size, symbol count, and date ranges.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove cached symbols written more than the given number of days ago.
    Clean {
        #[arg(long)]
        unused_days: u64,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

/// Options of the `run` command after clap parsing.
struct RunArgs {
    config: Option<PathBuf>,
    tickers: Option<Vec<String>>,
    benchmark: Option<String>,
    start: Option<String>,
    end: Option<String>,
    offline: bool,
    synthetic: bool,
    force: bool,
    cache_dir: PathBuf,
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Download {
            symbols,
            start,
            end,
            force,
            cache_dir,
        } => run_download(symbols, start, end, force, cache_dir),
        Commands::Run {
            config,
            tickers,
            benchmark,
            start,
            end,
            offline,
            synthetic,
            force,
            cache_dir,
            output_dir,
        } => run_backtest_cmd(RunArgs {
            config,
            tickers,
            benchmark,
            start,
            end,
            offline,
            synthetic,
            force,
            cache_dir,
            output_dir,
        }),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                unused_days,
                cache_dir,
                confirm,
            } => run_cache_clean(&cache_dir, unused_days, confirm),
        },
    }
}

/// Logs go to stderr so stdout stays clean for tables.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn run_download(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let start_date = start
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive() - chrono::Duration::days(365 * 10));

    let end_date = end
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker)?;
    let cache = ParquetCache::new(cache_dir);
    let progress = StdoutProgress;

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();

    let summary = download_symbols(
        &provider, &cache, &sym_refs, start_date, end_date, force, &progress,
    );
    if summary.skipped > 0 {
        println!("{} symbol(s) already cached for the range", summary.skipped);
    }

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Apply command-line overrides on top of the file (or default) config.
fn resolve_config(args: &RunArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    if let Some(tickers) = &args.tickers {
        config.backtest.universe = tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if let Some(benchmark) = &args.benchmark {
        config.backtest.benchmark = benchmark.clone();
    }
    if let Some(start) = &args.start {
        config.backtest.start_date = parse_date(start)?;
    }
    if let Some(end) = &args.end {
        config.backtest.end_date = parse_date(end)?;
    }
    config.validate()?;
    Ok(config)
}

fn run_backtest_cmd(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    let opts = LoadOptions {
        start: config.backtest.start_date,
        end: config.backtest.end_date,
        offline: args.offline,
        synthetic: args.synthetic,
        force: args.force,
    };

    let cache = ParquetCache::new(&args.cache_dir);
    let provider = if args.offline {
        None
    } else {
        Some(YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    tracing::info!(
        universe = config.backtest.universe.len(),
        benchmark = %config.backtest.benchmark,
        offline = args.offline,
        "starting backtest"
    );
    let progress = StdoutProgress;

    let loaded = load_market_data(
        &config.backtest.universe,
        &config.backtest.benchmark,
        &cache,
        provider_ref,
        Some(&progress),
        &opts,
    )?;
    let mut run = run_backtest_from_data(&config, &loaded.history, &loaded.benchmark)?;
    run.data_sources = loaded.sources.into_iter().collect();
    run.has_synthetic = loaded.has_synthetic;

    print_summary(&run);
    print_monthly(&run);
    print_drawdowns(&run);
    print_returns_grid("Portfolio", &run.report.monthly_returns, |r| r.portfolio_pct);
    print_returns_grid(
        &run.report.summary.benchmark_symbol,
        &run.report.monthly_returns,
        |r| r.benchmark_pct,
    );
    print_trades(&run);

    let run_dir = save_artifacts(&run, &loaded.benchmark.forward_filled(), &args.output_dir)?;
    println!("\nArtifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.symbols()?;
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let mut total_size: u64 = 0;
    let mut rows: Vec<(String, String, String, u64)> = Vec::new();

    for status in cache.status(&sym_refs) {
        let (date_range, bars) = match (status.start_date, status.end_date, status.bar_count) {
            (Some(start), Some(end), Some(count)) => {
                (format!("{start} to {end}"), format!("{count} bars"))
            }
            _ => ("(no meta)".into(), "-".into()),
        };
        let size = dir_size(&cache_dir.join(format!("symbol={}", status.symbol)));
        total_size += size;
        rows.push((status.symbol, date_range, bars, size));
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<8} {:<25} {:<12} {:>10}", "Symbol", "Date Range", "Bars", "Size");
    println!("{}", "-".repeat(58));
    for (sym, range, bars, size) in &rows {
        println!("{:<8} {:<25} {:<12} {:>10}", sym, range, bars, format_size(*size));
    }

    Ok(())
}

fn run_cache_clean(cache_dir: &Path, unused_days: u64, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cutoff = chrono::Local::now().naive_local() - chrono::Duration::days(unused_days as i64);

    let mut to_remove: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(cache_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(symbol) = name.strip_prefix("symbol=") else {
            continue;
        };

        // Unreadable metadata is left alone.
        let stale = std::fs::read_to_string(entry.path().join("meta.json"))
            .ok()
            .and_then(|content| serde_json::from_str::<CacheMeta>(&content).ok())
            .is_some_and(|meta| meta.cached_at < cutoff);

        if stale {
            to_remove.push((symbol.to_string(), entry.path()));
        }
    }
    to_remove.sort();

    if to_remove.is_empty() {
        println!("No symbols older than {unused_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} symbol(s) cached more than {unused_days} days ago:",
        to_remove.len()
    );
    for (sym, path) in &to_remove {
        println!("  {sym} ({})", format_size(dir_size(path)));
    }

    if !confirm {
        println!();
        println!("Dry run; pass --confirm to actually delete.");
        return Ok(());
    }

    for (sym, path) in &to_remove {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        tracing::info!(symbol = %sym, "removed cached symbol");
        println!("Removed: {sym}");
    }

    println!("Done. Removed {} symbol(s).", to_remove.len());
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

// ─── Console output ─────────────────────────────────────────────────

fn print_summary(run: &BacktestRun) {
    let s = &run.report.summary;
    let m = &s.portfolio;
    println!();
    println!("=== Backtest Result ===");
    println!("Run ID:         {}", s.run_id);
    println!("Universe:       {} tickers", run.result.tickers.len());
    println!(
        "Period:         {} to {}",
        s.start_date.map(|d| d.to_string()).unwrap_or_default(),
        s.end_date.map(|d| d.to_string()).unwrap_or_default()
    );
    println!("Trading days:   {}", s.trading_days);
    println!("Signals:        {}", s.signal_count);
    println!("Trades:         {} ({} open at end)", m.trade_count, s.open_positions);
    println!("Blocked days:   {}", s.blocked_days);
    println!();
    println!("--- Performance ---");
    println!("Starting cash:  ${:.2}", s.starting_cash);
    println!("Final value:    ${:.2}", s.final_value);
    println!("Total Return:   {:.2}%", m.equity.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.equity.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.equity.sharpe);
    println!("Sortino:        {:.3}", m.equity.sortino);
    println!("Max Drawdown:   {:.2}%", m.equity.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Total commission: ${:.2}", s.total_commission);
    if let Some(b) = &s.benchmark {
        println!();
        println!("--- Benchmark ({}) ---", s.benchmark_symbol);
        println!("Total Return:   {:.2}%", b.total_return * 100.0);
        println!("CAGR:           {:.2}%", b.cagr * 100.0);
        println!("Sharpe:         {:.3}", b.sharpe);
        println!("Max Drawdown:   {:.2}%", b.max_drawdown * 100.0);
    }
    if run.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

fn print_monthly(run: &BacktestRun) {
    println!();
    println!("Portfolio holdings and tickers unable to fund (first trading day of each month):");
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>4}  {:<30}  {}",
        "Date", "Total", "Invested", "Cash", "Benchmark", "Held", "Holdings", "Unable to fund"
    );
    for row in &run.report.monthly {
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10} {:>4}  {:<30}  {}",
            row.date,
            row.total_value,
            row.invested_value,
            row.cash,
            row.benchmark_value
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into()),
            row.num_holdings(),
            row.holdings.join(","),
            row.blocked.join(","),
        );
    }
}

fn print_drawdown_rows(label: &str, points: &[DrawdownPoint]) {
    println!();
    println!("Worst {label} drawdowns (month starts):");
    for p in points {
        println!("  {}  {:>10.2}  {:>8.2}%", p.date, p.value, p.drawdown_pct);
    }
}

fn print_drawdowns(run: &BacktestRun) {
    let dd = &run.report.drawdowns;
    print_drawdown_rows(&run.report.summary.benchmark_symbol, &dd.benchmark_worst);
    print_drawdown_rows("portfolio", &dd.portfolio_worst);
    if let Some(max) = &dd.portfolio_max {
        println!(
            "\nMax portfolio drawdown: {:.2}% on {}",
            max.drawdown_pct, max.date
        );
    }
}

fn print_returns_grid(
    label: &str,
    returns: &[MonthlyReturn],
    column: impl Fn(&MonthlyReturn) -> Option<f64>,
) {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let grid = pivot_by_year(returns, column);
    if grid.is_empty() {
        return;
    }
    println!();
    println!("{label} monthly returns (%):");
    print!("{:<6}", "Year");
    for m in MONTHS {
        print!("{m:>7}");
    }
    println!();
    for (year, cells) in &grid {
        print!("{year:<6}");
        for cell in cells {
            match cell {
                Some(v) => print!("{v:>7.2}"),
                None => print!("{:>7}", ""),
            }
        }
        println!();
    }
}

fn print_trade_rows(trades: &[Trade]) {
    println!(
        "{:<6} {:<10} {:>10} {:<10} {:>10} {:>8}",
        "Ticker", "Bought", "Buy Px", "Sold", "Sell Px", "Return"
    );
    for t in trades {
        println!(
            "{:<6} {:<10} {:>10.2} {:<10} {:>10.2} {:>7.2}%",
            t.ticker, t.entry_date, t.entry_price, t.exit_date, t.exit_price, t.return_pct
        );
    }
}

fn print_trades(run: &BacktestRun) {
    let report = &run.report;
    if report.first_trades.is_empty() {
        println!("\nNo trades were closed.");
        return;
    }
    println!("\nFirst trades:");
    print_trade_rows(&report.first_trades);
    println!("\nLast trades:");
    print_trade_rows(&report.last_trades);

    if let Some(stats) = &report.trade_returns {
        println!();
        println!(
            "Trade returns: n={} mean={:.2}% median={:.2}% std={:.2}% min={:.2}% max={:.2}%",
            stats.count, stats.mean, stats.median, stats.std_dev, stats.min, stats.max
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn run_args() -> RunArgs {
        RunArgs {
            config: None,
            tickers: None,
            benchmark: None,
            start: None,
            end: None,
            offline: true,
            synthetic: false,
            force: false,
            cache_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("results"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "breakout52",
            "run",
            "--tickers",
            "AAPL,MSFT",
            "--benchmark",
            "^GSPC",
            "--offline",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                tickers,
                benchmark,
                offline,
                ..
            } => {
                assert_eq!(tickers, Some(vec!["AAPL".to_string(), "MSFT".to_string()]));
                assert_eq!(benchmark.as_deref(), Some("^GSPC"));
                assert!(offline);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn overrides_apply_on_defaults() {
        let mut args = run_args();
        args.tickers = Some(vec![" ko ".into(), "pg".into()]);
        args.start = Some("2021-01-04".into());
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.backtest.universe, vec!["KO", "PG"]);
        assert_eq!(
            config.backtest.start_date,
            NaiveDate::from_ymd_opt(2021, 1, 4).unwrap()
        );
        assert_eq!(config.backtest.benchmark, "^DJI");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut args = run_args();
        args.start = Some("2025-01-01".into());
        args.end = Some("2024-01-01".into());
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn bad_date_reports_input() {
        let err = parse_date("2024/01/01").unwrap_err();
        assert!(err.to_string().contains("2024/01/01"));
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
