//! Backtest report as files in an output directory:
//! `trades.csv`, `equity.csv` and `summary.json`.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpotTraderError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub struct CsvReportAdapter;

#[derive(Serialize)]
struct TradeRow<'a> {
    timestamp: String,
    symbol: &'a str,
    side: &'static str,
    quantity: f64,
    price: f64,
    value: f64,
    fee: f64,
}

#[derive(Serialize)]
struct EquityRow {
    timestamp: String,
    equity: f64,
}

#[derive(Serialize)]
struct Summary<'a> {
    symbol: &'a str,
    strategy: &'a str,
    initial_balance: f64,
    final_balance: f64,
    total_return_pct: f64,
    total_pnl: f64,
    trades: usize,
    round_trips: usize,
    win_rate_pct: f64,
    max_drawdown_pct: f64,
    sharpe_ratio: f64,
    /// `None` when there were no losing round trips.
    profit_factor: Option<f64>,
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> SpotTraderError {
    SpotTraderError::Io(std::io::Error::other(format!("{}: {}", path.display(), e)))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), SpotTraderError> {
        let dir = Path::new(output_path);
        fs::create_dir_all(dir)?;

        let trades_path = dir.join("trades.csv");
        let mut writer = csv::Writer::from_path(&trades_path).map_err(|e| write_error(&trades_path, e))?;
        for trade in &result.trades {
            writer
                .serialize(TradeRow {
                    timestamp: trade.timestamp.to_rfc3339(),
                    symbol: &trade.symbol,
                    side: trade.side.as_str(),
                    quantity: trade.quantity,
                    price: trade.price,
                    value: trade.value(),
                    fee: trade.fee,
                })
                .map_err(|e| write_error(&trades_path, e))?;
        }
        writer.flush()?;

        let equity_path = dir.join("equity.csv");
        let mut writer = csv::Writer::from_path(&equity_path).map_err(|e| write_error(&equity_path, e))?;
        for point in &result.equity_curve {
            writer
                .serialize(EquityRow {
                    timestamp: point.timestamp.to_rfc3339(),
                    equity: point.equity,
                })
                .map_err(|e| write_error(&equity_path, e))?;
        }
        writer.flush()?;

        let summary = Summary {
            symbol: &result.symbol,
            strategy: &result.strategy,
            initial_balance: result.initial_balance,
            final_balance: result.final_balance,
            total_return_pct: result.total_return,
            total_pnl: result.stats.total_pnl,
            trades: result.trades.len(),
            round_trips: result.round_trips.len(),
            win_rate_pct: result.win_rate,
            max_drawdown_pct: result.max_drawdown,
            sharpe_ratio: result.sharpe_ratio,
            profit_factor: result.stats.profit_factor.is_finite().then_some(result.stats.profit_factor),
        };
        let summary_path = dir.join("summary.json");
        let json = serde_json::to_string_pretty(&summary).map_err(|e| write_error(&summary_path, e))?;
        fs::write(&summary_path, json)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::EquityPoint;
    use crate::domain::metrics::TradeStats;
    use crate::domain::trade::{Side, Trade, round_trips};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let trades = vec![
            Trade {
                symbol: "BTCBRL".into(),
                side: Side::Buy,
                quantity: 2.0,
                price: 100.0,
                timestamp: t0,
                fee: 0.0,
            },
            Trade {
                symbol: "BTCBRL".into(),
                side: Side::Sell,
                quantity: 2.0,
                price: 110.0,
                timestamp: t0 + Duration::hours(1),
                fee: 0.0,
            },
        ];
        let trips = round_trips(&trades);
        let stats = TradeStats::compute(&trips);
        BacktestResult {
            symbol: "BTCBRL".into(),
            strategy: "sma-crossover".into(),
            trades,
            round_trips: trips,
            equity_curve: vec![
                EquityPoint {
                    timestamp: t0,
                    equity: 1_000.0,
                },
                EquityPoint {
                    timestamp: t0 + Duration::hours(1),
                    equity: 1_020.0,
                },
            ],
            initial_balance: 1_000.0,
            final_balance: 1_020.0,
            total_return: 2.0,
            win_rate: stats.win_rate,
            max_drawdown: 0.0,
            sharpe_ratio: stats.sharpe_ratio,
            stats,
        }
    }

    #[test]
    fn writes_all_report_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report");
        CsvReportAdapter
            .write(&sample_result(), out.to_str().unwrap())
            .unwrap();

        let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
        let mut lines = trades.lines();
        assert_eq!(lines.next().unwrap(), "timestamp,symbol,side,quantity,price,value,fee");
        assert!(lines.next().unwrap().contains(",BUY,"));
        assert!(lines.next().unwrap().contains(",SELL,"));

        let equity = fs::read_to_string(out.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["round_trips"], 1);
        assert_eq!(summary["total_pnl"], 20.0);
        assert!(summary["profit_factor"].is_null());
    }
}
