//! Parquet cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar per symbol (BLAKE3 hash, date range, bar count).
//!
//! Writes go to `.tmp` and are renamed into place. A file that fails to load
//! is renamed to `.quarantined` and skipped.

use super::provider::{DataError, DataSource, RawBar};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const EXPECTED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Write bars for a symbol, one Parquet file per calendar year.
    ///
    /// Bars must be sorted by date. Existing years are overwritten.
    pub fn write(&self, symbol: &str, bars: &[RawBar], source: DataSource) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut by_year: BTreeMap<i32, Vec<&RawBar>> = BTreeMap::new();
        for bar in bars {
            by_year.entry(bar.date.year()).or_default().push(bar);
        }

        for (year, year_bars) in &by_year {
            let mut df = bars_to_dataframe(year_bars)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;

            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let payload = serde_json::to_vec(bars)
            .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            data_hash: blake3::hash(&payload).to_hex().to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        tracing::debug!(symbol, bars = bars.len(), "cached bars");
        Ok(())
    }

    /// Load all cached bars for a symbol, sorted by date ascending.
    pub fn load(&self, symbol: &str) -> Result<Vec<RawBar>, DataError> {
        let sym_dir = self.symbol_dir(symbol);
        if !sym_dir.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let entries =
            fs::read_dir(&sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut all_bars = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
                .path();

            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path) {
                Ok(bars) => all_bars.extend(bars),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "quarantining corrupt cache file"
                    );
                    let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                }
            }
        }

        if all_bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        all_bars.sort_by_key(|b| b.date);
        all_bars.dedup_by_key(|b| b.date);
        Ok(all_bars)
    }

    /// Load cached bars within `[start, end]`.
    pub fn load_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let bars: Vec<RawBar> = self
            .load(symbol)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        if bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols present in the cache directory, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("symbol="))
                    .map(str::to_string)
            })
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }

    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start_date <= start && meta.end_date >= end => {
                CoverageResult::FullyCovered
            }
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[&RawBar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<RawBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in EXPECTED_COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<RawBar>, DataError> {
    let column = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let type_err =
        |name: &str, e: PolarsError| DataError::ParquetError(format!("{name} column type: {e}"));

    let date_ca = column("date")?.date().map_err(|e| type_err("date", e))?;
    let open_ca = column("open")?.f64().map_err(|e| type_err("open", e))?;
    let high_ca = column("high")?.f64().map_err(|e| type_err("high", e))?;
    let low_ca = column("low")?.f64().map_err(|e| type_err("low", e))?;
    let close_ca = column("close")?.f64().map_err(|e| type_err("close", e))?;
    let vol_ca = column("volume")?.u64().map_err(|e| type_err("volume", e))?;

    let epoch = epoch();
    (0..df.height())
        .map(|i| {
            let days = date_ca
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
            Ok(RawBar {
                date: epoch + chrono::Duration::days(days as i64),
                open: open_ca.get(i).unwrap_or(f64::NAN),
                high: high_ca.get(i).unwrap_or(f64::NAN),
                low: low_ca.get(i).unwrap_or(f64::NAN),
                close: close_ca.get(i).unwrap_or(f64::NAN),
                volume: vol_ca.get(i).unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(y: i32, m: u32, d: u32, close: f64) -> RawBar {
        RawBar {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn epoch_is_unix_epoch() {
        assert_eq!(epoch(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[test]
    fn write_and_load_across_years() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let bars = vec![bar(2023, 12, 29, 100.0), bar(2024, 1, 2, 101.0)];

        cache.write("KO", &bars, DataSource::YahooFinance).unwrap();
        let loaded = cache.load("KO").unwrap();

        assert_eq!(loaded, bars);
        assert!(dir.path().join("symbol=KO").join("2023.parquet").exists());
        assert!(dir.path().join("symbol=KO").join("2024.parquet").exists());
    }

    #[test]
    fn load_range_filters_dates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache
            .write(
                "KO",
                &[bar(2024, 1, 2, 1.0), bar(2024, 1, 3, 2.0), bar(2024, 1, 4, 3.0)],
                DataSource::YahooFinance,
            )
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let loaded = cache.load_range("KO", start, end).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 2.0);
    }

    #[test]
    fn missing_symbol_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(
            cache.load("NONE"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let sym_dir = dir.path().join("symbol=BAD");
        fs::create_dir_all(&sym_dir).unwrap();
        fs::write(sym_dir.join("2024.parquet"), b"not parquet").unwrap();

        assert!(cache.load("BAD").is_err());
        assert!(sym_dir.join("2024.parquet.quarantined").exists());
    }

    #[test]
    fn meta_status_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache
            .write(
                "SPY",
                &[bar(2024, 1, 2, 1.0), bar(2024, 1, 3, 2.0)],
                DataSource::YahooFinance,
            )
            .unwrap();

        let meta = cache.get_meta("SPY").unwrap();
        assert_eq!(meta.bar_count, 2);
        assert_eq!(meta.source, DataSource::YahooFinance);

        let statuses = cache.status(&["SPY", "QQQ"]);
        assert!(statuses[0].cached);
        assert!(!statuses[1].cached);

        let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let d9 = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(
            cache.covers_range("SPY", d2, d2),
            CoverageResult::FullyCovered
        );
        assert!(matches!(
            cache.covers_range("SPY", d2, d9),
            CoverageResult::PartiallyCovered { .. }
        ));
        assert_eq!(cache.symbols().unwrap(), vec!["SPY".to_string()]);
    }
}
