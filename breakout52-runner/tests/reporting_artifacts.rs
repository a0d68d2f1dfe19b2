use breakout52_core::{BenchmarkSeries, PriceHistory, PriceSeries};
use breakout52_runner::export::{load_manifest, save_artifacts};
use breakout52_runner::runner::{run_backtest_from_data, BacktestRun, SCHEMA_VERSION};
use breakout52_runner::BacktestConfig;
use chrono::NaiveDate;

const ARTIFACTS: [&str; 9] = [
    "manifest.json",
    "equity.csv",
    "trades.csv",
    "monthly.csv",
    "monthly_returns.csv",
    "blocked.csv",
    "open_positions.csv",
    "report.json",
    "report.md",
];

fn make_run() -> (BacktestRun, BenchmarkSeries) {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let dates: Vec<NaiveDate> = (0..120).map(|i| start + chrono::Duration::days(i)).collect();
    let a: Vec<f64> = (0..120).map(|i| 10.0 + (i % 11) as f64).collect();
    let b: Vec<f64> = (0..120).map(|i| 40.0 + (i % 13) as f64).collect();
    let history = PriceHistory::from_columns(
        dates,
        vec![
            ("AAA".to_string(), PriceSeries::new(a.clone(), a)),
            ("BBB".to_string(), PriceSeries::new(b.clone(), b)),
        ],
    )
    .unwrap();
    let bench = BenchmarkSeries::new("^DJI", (0..120).map(|i| 1000.0 + i as f64).collect());

    let mut config = BacktestConfig::default();
    config.backtest.universe = vec!["AAA".into(), "BBB".into()];
    config.strategy.starting_cash = 30.0;
    config.strategy.lookback_window = 10;
    config.strategy.min_periods = 2;
    config.strategy.hold_period_days = 12;

    let run = run_backtest_from_data(&config, &history, &bench).unwrap();
    (run, bench)
}

#[test]
fn saves_full_artifact_set() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (run, bench) = make_run();

    let run_dir = save_artifacts(&run, &bench.forward_filled(), temp_dir.path()).unwrap();
    assert_eq!(run_dir, temp_dir.path().join(run.run_id()));
    for name in ARTIFACTS {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), 121);
    let trades = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), run.result.trades.len() + 1);
    let monthly = std::fs::read_to_string(run_dir.join("monthly.csv")).unwrap();
    assert_eq!(monthly.lines().count(), run.report.monthly.len() + 1);

    // Cash for only one position at a time: some breakouts must be blocked.
    let blocked = std::fs::read_to_string(run_dir.join("blocked.csv")).unwrap();
    assert!(blocked.lines().count() > 1);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run_dir.join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["summary"]["run_id"], run.run_id());

    let md = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert!(md.contains(run.run_id()));
}

#[test]
fn manifest_round_trips() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (run, bench) = make_run();
    let run_dir = save_artifacts(&run, &bench.forward_filled(), temp_dir.path()).unwrap();

    let manifest = load_manifest(&run_dir).unwrap();
    assert_eq!(manifest.schema_version, SCHEMA_VERSION);
    assert_eq!(manifest.run_id, run.run_id());
    assert_eq!(manifest.fingerprint, run.result.fingerprint);
    assert_eq!(manifest.config, run.config);
}

#[test]
fn newer_schema_version_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (run, bench) = make_run();
    let run_dir = save_artifacts(&run, &bench.forward_filled(), temp_dir.path()).unwrap();

    let path = run_dir.join("manifest.json");
    let mut manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    manifest["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
    std::fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let err = load_manifest(&run_dir).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn saving_twice_overwrites_same_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (run, bench) = make_run();
    let first = save_artifacts(&run, &bench.forward_filled(), temp_dir.path()).unwrap();
    let second = save_artifacts(&run, &[], temp_dir.path()).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}
