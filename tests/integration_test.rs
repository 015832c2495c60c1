//! Integration tests across the domain and adapters.
//!
//! Tests cover:
//! - Backtest replay scenarios (buy-and-hold, no crossover, fees, drawdown)
//! - Fusion policy and signal source composition
//! - Fee-aware sizing worked example
//! - CSV klines replayed through the backtest
//! - Position restore from the SQLite store

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use common::*;
use spottrader::domain::backtest::{BacktestConfig, run_backtest};
use spottrader::domain::error::SpotTraderError;
use spottrader::domain::fusion::{Action, ExitReason, StrategySignals, decide};
use spottrader::domain::lifecycle::ExitChecks;
use spottrader::domain::signal_source::SignalSource;
use spottrader::domain::sizing::{FeeEngine, FeeSchedule, SizingConfig, SymbolRules, fee_adjusted_amount};
use spottrader::domain::strategy::{
    CrossoverParams, CrossoverStrategy, ExitGuard, RsiVolumeParams, RsiVolumeStrategy, Strategy,
};
use spottrader::domain::tick::WalletBalances;
use spottrader::domain::trade::Side;

fn crossover(short: usize, long: usize) -> CrossoverStrategy {
    CrossoverStrategy::new(
        CrossoverParams {
            short_period: short,
            long_period: long,
        },
        ExitGuard::new(5.0, 2.0),
        SizingConfig::default(),
    )
}

fn rsi_volume() -> RsiVolumeStrategy {
    RsiVolumeStrategy::new(
        RsiVolumeParams::default(),
        ExitGuard::new(5.0, 2.0),
        FeeEngine::new(FeeSchedule::default(), SizingConfig::default(), None),
    )
}

mod backtest_scenarios {
    use super::*;

    #[test]
    fn buy_and_hold_on_rising_series() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let ticks = ticks_from_prices(&prices);
        let mut strategy = BuyOnce::new(2.0);

        let result = run_backtest(&mut strategy, &ticks, &BacktestConfig::new(SYMBOL, 10_000.0)).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].side, Side::Buy);
        assert!(result.round_trips.is_empty());
        assert_relative_eq!(result.final_balance, 10_000.0 - 2.0 * 100.0 + 2.0 * 109.0);
        assert_eq!(result.max_drawdown, 0.0);
        assert_eq!(result.equity_curve.len(), 10);
        assert_eq!(result.win_rate, 0.0);
    }

    #[test]
    fn monotonic_series_never_crosses() {
        let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let ticks = ticks_from_prices(&prices);
        let mut strategy = crossover(3, 5);

        let result = run_backtest(&mut strategy, &ticks, &BacktestConfig::new(SYMBOL, 10_000.0)).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.total_return, 0.0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.sharpe_ratio, 0.0);
        assert!(!result.win_rate.is_nan());
    }

    #[test]
    fn band_round_trip_without_fees() {
        let ticks = ticks_from_prices(&[90.0, 120.0, 90.0, 100.0]);
        let mut strategy = BandStrategy::new(95.0, 110.0, 1.0);

        let result = run_backtest(&mut strategy, &ticks, &BacktestConfig::new(SYMBOL, 10_000.0)).unwrap();

        assert_eq!(result.trades.len(), 3);
        assert_eq!(result.round_trips.len(), 1);
        assert_abs_diff_eq!(result.round_trips[0].pnl, 30.0);
        assert_abs_diff_eq!(result.final_balance, 10_040.0);
        assert_abs_diff_eq!(result.total_return, 0.4, epsilon = 1e-9);
        assert_eq!(result.win_rate, 100.0);
        assert!(result.trades.iter().all(|t| t.fee == 0.0));
        assert_eq!(strategy.fills.lock().unwrap().len(), 3);
    }

    #[test]
    fn apply_fees_charges_taker_rate_on_every_fill() {
        let ticks = ticks_from_prices(&[90.0, 120.0, 90.0, 100.0]);
        let mut strategy = BandStrategy::new(95.0, 110.0, 1.0);
        let mut config = BacktestConfig::new(SYMBOL, 10_000.0);
        config.apply_fees = true;
        config.taker_fee_rate = 0.001;

        let result = run_backtest(&mut strategy, &ticks, &config).unwrap();

        assert_abs_diff_eq!(result.trades[0].fee, 0.09, epsilon = 1e-12);
        assert_abs_diff_eq!(result.trades[1].fee, 0.12, epsilon = 1e-12);
        assert_abs_diff_eq!(result.round_trips[0].pnl, 29.79, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_balance, 10_039.70, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_is_measured_from_running_peak() {
        let ticks = ticks_from_prices(&[90.0, 120.0, 90.0, 60.0]);
        let mut strategy = BandStrategy::new(95.0, 110.0, 1.0);

        let result = run_backtest(&mut strategy, &ticks, &BacktestConfig::new(SYMBOL, 10_000.0)).unwrap();

        // peak 10 030 after the sell, trough 10 000 holding at 60
        assert_relative_eq!(result.max_drawdown, 30.0 / 10_030.0 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_balance, 10_000.0);
    }

    #[test]
    fn empty_series_is_a_precondition_error() {
        let mut strategy = BuyOnce::new(1.0);
        let result = run_backtest(&mut strategy, &[], &BacktestConfig::new(SYMBOL, 10_000.0));
        assert!(matches!(result, Err(SpotTraderError::EmptySeries { symbol }) if symbol == SYMBOL));
    }
}

mod fusion_policy {
    use super::*;

    #[test]
    fn max_age_exit_ignores_minimum_holding_veto() {
        let checks = ExitChecks {
            max_age: true,
            below_min_holding: true,
            ..ExitChecks::default()
        };
        let decision = decide(StrategySignals::default(), Some(checks), true);
        assert_eq!(decision.action, Action::Sell);
        assert_eq!(decision.exit_reason, Some(ExitReason::MaxAge));
    }

    #[test]
    fn fused_source_sizes_through_oscillator() {
        let source = SignalSource::fused(crossover(12, 15), rsi_volume());
        assert_eq!(source.name(), "sma-crossover+rsi-volume");
        assert_eq!(source.sizer().name(), "rsi-volume");
        assert_eq!(
            source.required_history(),
            crossover(12, 15).required_history().max(rsi_volume().required_history())
        );
    }

    #[test]
    fn single_source_never_pyramids() {
        let source = SignalSource::single(Box::new(BandStrategy::new(95.0, 110.0, 1.0)));
        let tick = tick_at(90.0, t0());

        let flat = source.evaluate(&tick, None, true);
        assert_eq!(flat.action, Action::Buy);

        let holding = source.evaluate(&tick, Some(ExitChecks::default()), true);
        assert_eq!(holding.action, Action::Keep);
    }
}

mod sizing {
    use super::*;

    #[test]
    fn fee_adjusted_worked_example() {
        let config = SizingConfig {
            trade_percentage: 5.0,
            include_fees: true,
            fee_buffer_percentage: 0.2,
            min_trade_amount: 10.0,
        };
        let breakdown = fee_adjusted_amount(1_000.0, 1_000.0, &config, 0.001).unwrap();

        assert_relative_eq!(breakdown.desired_net, 50.0);
        assert_relative_eq!(breakdown.gross_notional, 50.0 / 0.999, epsilon = 1e-9);
        assert_abs_diff_eq!(breakdown.buffer, 0.1001, epsilon = 1e-4);
        assert_abs_diff_eq!(breakdown.total_required, 50.15, epsilon = 1e-2);
        assert_relative_eq!(breakdown.trade_amount, 50.0, epsilon = 1e-9);
        assert!(!breakdown.used_fallback);
    }

    #[test]
    fn fee_engine_rounds_to_lot_step() {
        let rules = SymbolRules {
            step_size: 0.001,
            min_qty: 0.001,
            max_qty: 1_000.0,
            min_notional: 10.0,
        };
        let engine = FeeEngine::new(FeeSchedule::default(), SizingConfig::default(), Some(rules));
        let tick = tick_at(300.0, t0());

        let size = engine
            .position_size(&tick, &WalletBalances::new(1_000.0, 0.0))
            .unwrap();

        // 50 / 300 = 0.1666.. rounds to the nearest step
        assert_abs_diff_eq!(size.quantity, 0.167, epsilon = 1e-12);
        assert!(size.raw_quantity < size.quantity);
    }
}

mod csv_replay {
    use super::*;
    use spottrader::adapters::csv_adapter::CsvAdapter;
    use spottrader::ports::data_port::DataPort;

    #[test]
    fn downloaded_csv_replays_through_backtest() {
        let dir = tempfile::TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let mut prices: Vec<f64> = (0..15).map(|i| 120.0 - i as f64).collect();
        prices.extend((0..15).map(|i| 106.0 + 2.0 * i as f64));
        adapter.write_klines(SYMBOL, "1h", &klines_from_prices(&prices)).unwrap();

        let klines = adapter.fetch_klines(SYMBOL, "1h", None).unwrap();
        assert_eq!(klines.len(), prices.len());
        let ticks: Vec<_> = klines.iter().map(|k| k.to_tick(SYMBOL)).collect();

        let mut strategy = crossover(3, 5);
        let result = run_backtest(&mut strategy, &ticks, &BacktestConfig::new(SYMBOL, 10_000.0)).unwrap();

        assert!(!result.trades.is_empty());
        assert_eq!(result.trades[0].side, Side::Buy);
        assert_eq!(result.equity_curve.len(), prices.len());
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_restore {
    use super::*;
    use spottrader::adapters::sqlite_adapter::SqliteAdapter;
    use spottrader::domain::trader::{Trader, TraderConfig};
    use spottrader::ports::position_store::PositionStore;

    #[test]
    fn trader_restores_position_from_sqlite() {
        let store = SqliteAdapter::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store.save(&position_record(0.5, 100.0)).unwrap();

        let (tx, _rx) = flume::unbounded();
        let mut trader = Trader::new(
            MockExchange::new(1_000.0, 0.5),
            SignalSource::single(Box::new(BandStrategy::new(95.0, 110.0, 1.0))),
            TraderConfig::new(BASE, QUOTE),
            tx,
        )
        .with_store(Box::new(store));

        trader.startup().unwrap();

        let pos = trader.lifecycle().position().unwrap();
        assert_abs_diff_eq!(pos.quantity, 0.5);
        assert_abs_diff_eq!(pos.entry_price, 100.0);
        assert_eq!(pos.entry_time, t0());
    }
}
