//! Download orchestrator: multi-symbol fetches with progress reporting.

use super::cache::{CoverageResult, ParquetCache};
use super::provider::{DataError, DataProvider, DownloadProgress, RawBar};
use chrono::NaiveDate;

/// Download multiple symbols into the cache.
///
/// Symbols already covered for `[start, end]` are skipped unless `force` is
/// set. Once the provider stops accepting requests the remaining symbols are
/// reported as failed without being attempted.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut skipped = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !force && cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
            progress.on_complete(symbol, i, total, &Ok(()));
            succeeded += 1;
            skipped += 1;
            continue;
        }

        let result = download_single(provider, cache, symbol, start, end);
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "download failed");
                errors.push((symbol.to_string(), e));
            }
        }

        if !provider.is_available() {
            for sym in &symbols[(i + 1)..] {
                errors.push((sym.to_string(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);

    DownloadSummary {
        total,
        succeeded,
        skipped,
        failed,
        errors,
    }
}

fn download_single(
    provider: &dyn DataProvider,
    cache: &ParquetCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DataError> {
    let fetched = provider.fetch(symbol, start, end)?;
    let bars = normalize(fetched.bars);
    if bars.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    cache.write(symbol, &bars, fetched.source)
}

/// Sort by date and keep the last bar for any repeated date.
pub fn normalize(mut bars: Vec<RawBar>) -> Vec<RawBar> {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<RawBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Summary of a batch download.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Symbols whose cache already covered the range.
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
