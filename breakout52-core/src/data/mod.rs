//! Market data: providers, Parquet cache and calendar alignment.

pub mod align;
pub mod cache;
pub mod circuit_breaker;
pub mod download;
pub mod history;
pub mod provider;
pub mod yahoo;

pub use align::{align_benchmark, align_universe};
pub use cache::{CacheMeta, CacheStatus, CoverageResult, ParquetCache};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use download::{download_symbols, DownloadSummary};
pub use history::{BenchmarkSeries, HistoryError, PriceHistory, PriceSeries, TradingCalendar};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, InMemoryProvider, RawBar,
    StdoutProgress,
};
pub use yahoo::YahooProvider;
