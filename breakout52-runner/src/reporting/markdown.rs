//! Markdown report generator.

use std::fmt::Write;

use breakout52_core::Trade;

use super::returns_grid::pivot_by_year;
use super::{DrawdownPoint, PerformanceReport};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub struct MarkdownReportGenerator;

impl MarkdownReportGenerator {
    pub fn generate(&self, report: &PerformanceReport) -> String {
        let s = &report.summary;
        let p = &s.portfolio;
        let mut out = String::new();

        let _ = write!(
            out,
            "# Breakout52 Run Report\n\n\
Run ID: `{}`\n\n\
## Summary\n\
- Period: {} to {} ({} trading days)\n\
- Starting cash: ${:.2}\n\
- Final value: ${:.2}\n\
- Total Return: {:+.2}%\n\
- CAGR: {:+.2}%\n\
- Sharpe: {:.2}\n\
- Max Drawdown: {:+.2}%\n\
- Total commission: ${:.2}\n\
- Trades: {} closed, {} open at end\n\
- Win Rate: {:.1}%\n\
- Breakout signals: {}\n\
- Days with unfunded breakouts: {}\n",
            s.run_id,
            fmt_date(s.start_date),
            fmt_date(s.end_date),
            s.trading_days,
            s.starting_cash,
            s.final_value,
            p.equity.total_return * 100.0,
            p.equity.cagr * 100.0,
            p.equity.sharpe,
            p.equity.max_drawdown * 100.0,
            s.total_commission,
            p.trade_count,
            s.open_positions,
            p.win_rate * 100.0,
            s.signal_count,
            s.blocked_days,
        );

        if let Some(b) = &s.benchmark {
            let _ = write!(
                out,
                "\n### Benchmark ({})\n\
- Total Return: {:+.2}%\n\
- CAGR: {:+.2}%\n\
- Sharpe: {:.2}\n\
- Max Drawdown: {:+.2}%\n",
                s.benchmark_symbol,
                b.total_return * 100.0,
                b.cagr * 100.0,
                b.sharpe,
                b.max_drawdown * 100.0,
            );
        }

        out.push_str("\n## Drawdowns (month starts)\n\n");
        out.push_str("| Series | Date | Value | Drawdown |\n");
        out.push_str("|--------|------|-------|----------|\n");
        push_drawdowns(&mut out, "Portfolio", &report.drawdowns.portfolio_worst);
        push_drawdowns(&mut out, &s.benchmark_symbol, &report.drawdowns.benchmark_worst);
        if let Some(max) = &report.drawdowns.portfolio_max {
            let _ = writeln!(
                out,
                "\nWorst portfolio drawdown: {:.2}% on {}",
                max.drawdown_pct, max.date
            );
        }

        if !report.monthly_returns.is_empty() {
            out.push_str("\n## Monthly Returns (portfolio, %)\n\n");
            out.push_str("| Year |");
            for m in MONTHS {
                let _ = write!(out, " {m} |");
            }
            out.push_str("\n|------|");
            out.push_str(&"-----|".repeat(12));
            out.push('\n');
            for (year, months) in pivot_by_year(&report.monthly_returns, |r| r.portfolio_pct) {
                let _ = write!(out, "| {year} |");
                for value in months {
                    match value {
                        Some(v) => {
                            let _ = write!(out, " {v:+.1} |");
                        }
                        None => out.push_str("  |"),
                    }
                }
                out.push('\n');
            }
        }

        if let Some(t) = &report.trade_returns {
            let _ = write!(
                out,
                "\n## Trade Returns\n\n\
- Count: {}\n\
- Mean: {:+.2}%\n\
- Median: {:+.2}%\n\
- Std dev: {:.2}%\n\
- Min / Max: {:+.2}% / {:+.2}%\n",
                t.count, t.mean, t.median, t.std_dev, t.min, t.max,
            );
        }

        if !report.first_trades.is_empty() {
            out.push_str("\n## Trade Tape\n\n### First Trades\n");
            push_trades(&mut out, &report.first_trades);
            out.push_str("\n### Last Trades\n");
            push_trades(&mut out, &report.last_trades);
        }

        out.push_str(
            "\n## Notes\n\
- Monthly rows, equity curve and trades are exported alongside this report.\n",
        );

        out
    }
}

fn fmt_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

fn push_drawdowns(out: &mut String, label: &str, points: &[DrawdownPoint]) {
    for p in points {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} | {:.2}% |",
            label, p.date, p.value, p.drawdown_pct
        );
    }
}

fn push_trades(out: &mut String, trades: &[Trade]) {
    out.push_str("| Ticker | Entry | Exit | Entry Px | Exit Px | Return | Commission |\n");
    out.push_str("|--------|-------|------|----------|---------|--------|------------|\n");
    for t in trades {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.2} | {:.2} | {:+.2}% | ${:.4} |",
            t.ticker,
            t.entry_date,
            t.exit_date,
            t.entry_price,
            t.exit_price,
            t.return_pct,
            t.total_commission
        );
    }
}
