//! Bar loading and data resolution for the runner.
//!
//! For every universe symbol and the benchmark, applies the fallback policy:
//! 1. cache covers the requested range: use it
//! 2. otherwise, when online, download, normalize and cache
//! 3. a partially covering cache is used if the download fails
//! 4. with `synthetic` set, generate a deterministic random walk (tagged)
//! 5. otherwise fail with a clear error
//!
//! The loaded bars are then aligned onto the universe's trading calendar.

use std::collections::HashMap;

use breakout52_core::data::download::normalize;
use breakout52_core::data::{
    align_benchmark, align_universe, BenchmarkSeries, CoverageResult, DataError, DataProvider,
    DataSource, DownloadProgress, HistoryError, ParquetCache, PriceHistory, RawBar,
};
use breakout52_core::Ticker;
use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("alignment failed: {0}")]
    Alignment(#[from] HistoryError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Re-download even if cached.
    pub force: bool,
}

/// Aligned market data plus provenance.
#[derive(Debug)]
pub struct LoadedData {
    pub history: PriceHistory,
    pub benchmark: BenchmarkSeries,
    pub sources: HashMap<String, DataSource>,
    pub has_synthetic: bool,
}

/// Load the universe and the benchmark, aligned to one calendar.
pub fn load_market_data(
    universe: &[Ticker],
    benchmark: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    progress: Option<&dyn DownloadProgress>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let mut symbols: Vec<&str> = universe.iter().map(String::as_str).collect();
    symbols.push(benchmark);
    let total = symbols.len();

    let mut all_bars: HashMap<String, Vec<RawBar>> = HashMap::new();
    let mut sources: HashMap<String, DataSource> = HashMap::new();
    let mut has_synthetic = false;

    for (i, symbol) in symbols.iter().enumerate() {
        if let Some(p) = progress {
            p.on_start(symbol, i, total);
        }
        let resolved = resolve_symbol(symbol, cache, provider, opts);
        if let Some(p) = progress {
            let status = match &resolved {
                Ok(_) => Ok(()),
                Err(e) => Err(DataError::Other(e.to_string())),
            };
            p.on_complete(symbol, i, total, &status);
        }

        let (bars, source) = resolved?;
        if source == DataSource::Synthetic {
            has_synthetic = true;
        }
        all_bars.insert(symbol.to_string(), bars);
        sources.insert(symbol.to_string(), source);
    }

    if let Some(p) = progress {
        p.on_batch_complete(sources.len(), total - sources.len(), total);
    }

    let history = align_universe(universe, &all_bars)?;
    let benchmark_bars = all_bars.get(benchmark).map(Vec::as_slice).unwrap_or(&[]);
    let benchmark = align_benchmark(history.calendar(), benchmark, benchmark_bars);

    tracing::info!(
        symbols = universe.len(),
        days = history.num_days(),
        benchmark_days = benchmark.observed_count(),
        synthetic = has_synthetic,
        "market data loaded"
    );

    Ok(LoadedData {
        history,
        benchmark,
        sources,
        has_synthetic,
    })
}

fn resolve_symbol(
    symbol: &str,
    cache: &ParquetCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<(Vec<RawBar>, DataSource), LoadError> {
    let coverage = cache.covers_range(symbol, opts.start, opts.end);
    let cached = if opts.force {
        None
    } else {
        cache.load_range(symbol, opts.start, opts.end).ok()
    };

    if let Some(bars) = &cached {
        if coverage == CoverageResult::FullyCovered || opts.offline {
            return Ok((bars.clone(), DataSource::Cache));
        }
    }

    let mut reason = String::from("no data provider available");
    if !opts.offline {
        if let Some(prov) = provider.filter(|p| p.is_available()) {
            match download(symbol, cache, prov, opts) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "download failed");
                    reason = e.to_string();
                }
            }
        }
    }

    if let Some(bars) = cached {
        tracing::warn!(symbol, "using partially cached data");
        return Ok((bars, DataSource::Cache));
    }

    if opts.synthetic {
        tracing::warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
        let bars = generate_synthetic_bars(symbol, opts.start, opts.end);
        return Ok((bars, DataSource::Synthetic));
    }

    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason,
    })
}

fn download(
    symbol: &str,
    cache: &ParquetCache,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
) -> Result<(Vec<RawBar>, DataSource), DataError> {
    let fetched = provider.fetch(symbol, opts.start, opts.end)?;
    let bars = normalize(fetched.bars);
    if bars.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    cache.write(symbol, &bars, fetched.source)?;
    Ok((bars, fetched.source))
}

/// Deterministic random walk from 100.0, weekdays only. Seeded by symbol.
fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        // Slight upward drift so breakouts actually occur.
        let daily_return: f64 = rng.gen_range(-0.025..0.027);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(RawBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout52_core::data::InMemoryProvider;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(day: u32, close: f64) -> RawBar {
        RawBar {
            date: d(day),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    fn opts(offline: bool, synthetic: bool) -> LoadOptions {
        LoadOptions {
            start: d(2),
            end: d(3),
            offline,
            synthetic,
            force: false,
        }
    }

    fn universe(symbols: &[&str]) -> Vec<Ticker> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn load_from_cache_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache
            .write("SPY", &[bar(2, 101.0), bar(3, 102.0)], DataSource::YahooFinance)
            .unwrap();
        cache
            .write("^DJI", &[bar(2, 37_000.0), bar(3, 37_100.0)], DataSource::YahooFinance)
            .unwrap();

        let loaded = load_market_data(
            &universe(&["SPY"]),
            "^DJI",
            &cache,
            None,
            None,
            &opts(true, false),
        )
        .unwrap();

        assert_eq!(loaded.history.num_days(), 2);
        assert_eq!(loaded.history.close("SPY", 1), Some(102.0));
        assert_eq!(loaded.benchmark.close_at(0), Some(37_000.0));
        assert_eq!(loaded.sources["SPY"], DataSource::Cache);
        assert!(!loaded.has_synthetic);
    }

    #[test]
    fn offline_no_cache_fails_without_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        let err = load_market_data(
            &universe(&["SPY"]),
            "^DJI",
            &cache,
            None,
            None,
            &opts(true, false),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
        assert!(err.to_string().contains("no cached data"));
    }

    #[test]
    fn downloads_and_caches_missing_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = InMemoryProvider::new()
            .with_symbol("SPY", vec![bar(3, 102.0), bar(2, 101.0)])
            .with_symbol("^DJI", vec![bar(2, 37_000.0), bar(3, 37_100.0)]);

        let loaded = load_market_data(
            &universe(&["SPY"]),
            "^DJI",
            &cache,
            Some(&provider),
            None,
            &opts(false, false),
        )
        .unwrap();

        assert_eq!(loaded.sources["SPY"], DataSource::InMemory);
        assert_eq!(loaded.history.close("SPY", 0), Some(101.0));
        assert_eq!(cache.load("SPY").unwrap().len(), 2);
        assert_eq!(cache.covers_range("^DJI", d(2), d(3)), CoverageResult::FullyCovered);
    }

    #[test]
    fn failed_download_reports_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let provider = InMemoryProvider::new().with_symbol("SPY", vec![bar(2, 101.0)]);

        let err = load_market_data(
            &universe(&["SPY"]),
            "^DJI",
            &cache,
            Some(&provider),
            None,
            &opts(false, false),
        )
        .unwrap_err();
        match err {
            LoadError::DownloadFailed { symbol, .. } => assert_eq!(symbol, "^DJI"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn synthetic_fallback_produces_tagged_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        let options = LoadOptions {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            offline: false,
            synthetic: true,
            force: false,
        };
        let loaded = load_market_data(
            &universe(&["FAKE"]),
            "^FAKE",
            &cache,
            None,
            None,
            &options,
        )
        .unwrap();

        assert!(loaded.has_synthetic);
        assert_eq!(loaded.sources["FAKE"], DataSource::Synthetic);
        assert!(loaded.history.num_days() > 60);
        assert_eq!(loaded.benchmark.observed_count(), loaded.history.num_days());
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let a = generate_synthetic_bars("SPY", start, end);
        let b = generate_synthetic_bars("SPY", start, end);
        let other = generate_synthetic_bars("QQQ", start, end);

        assert_eq!(a, b);
        assert_eq!(a.len(), other.len());
        assert_ne!(a[0].close, other[0].close);
        assert!(a.iter().all(|bar| bar.date.weekday().number_from_monday() <= 5));
    }

    #[test]
    fn late_listing_aligns_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache
            .write("OLD", &[bar(2, 10.0), bar(3, 11.0)], DataSource::YahooFinance)
            .unwrap();
        cache
            .write("NEW", &[bar(3, 50.0)], DataSource::YahooFinance)
            .unwrap();
        cache
            .write("^DJI", &[bar(2, 1.0), bar(3, 2.0)], DataSource::YahooFinance)
            .unwrap();

        let loaded = load_market_data(
            &universe(&["OLD", "NEW"]),
            "^DJI",
            &cache,
            None,
            None,
            &opts(true, false),
        )
        .unwrap();

        assert_eq!(loaded.history.tickers(), &["OLD".to_string(), "NEW".to_string()]);
        assert_eq!(loaded.history.close("NEW", 0), None);
        assert_eq!(loaded.history.close("NEW", 1), Some(50.0));
    }
}
