//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    validate_backtest_config, validate_fee_config, validate_live_config, validate_strategy_config,
};
use crate::domain::error::SpotTraderError;
use crate::domain::event::TraderEvent;
use crate::domain::lifecycle::{ExitRules, Reconciliation};
use crate::domain::signal_source::SignalSource;
use crate::domain::sizing::{FeeEngine, FeeSchedule, SizingConfig};
use crate::domain::strategy::{
    CrossoverParams, CrossoverStrategy, ExitGuard, RsiVolumeParams, RsiVolumeStrategy, Strategy,
};
use crate::domain::trader::TraderConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_BASE_ASSET: &str = "BTC";
pub const DEFAULT_QUOTE_ASSET: &str = "BRL";
pub const DEFAULT_INTERVAL: &str = "1h";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "spottrader", about = "Single-asset spot trading agent and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the live trading loop until Ctrl-C
    Trade {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay historical klines through one strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        interval: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// sma or rsi-volume
        #[arg(long)]
        strategy: Option<String>,
        /// csv or binance
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory for trades.csv, equity.csv and summary.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save exchange klines to a CSV file
    Download {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
        #[arg(long, default_value_t = 1000)]
        limit: usize,
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with CSV data for an interval
    ListSymbols {
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
    },
}

/// Resolved inputs of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub symbol: String,
    pub interval: String,
    pub limit: usize,
    pub strategy: String,
    pub source: String,
    pub data_dir: PathBuf,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Trade { config } => run_trade(&config),
        Command::Backtest {
            config,
            symbol,
            interval,
            limit,
            strategy,
            source,
            data_dir,
            output,
        } => {
            let overrides = BacktestOverrides {
                symbol,
                interval,
                limit,
                strategy,
                source,
                data_dir,
            };
            run_backtest(&config, overrides, output.as_ref())
        }
        Command::Download {
            symbol,
            interval,
            limit,
            data_dir,
            config,
        } => run_download(&symbol, &interval, limit, &data_dir, config.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir, interval } => run_list_symbols(&data_dir, &interval),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// `RUST_LOG` wins over the configured `[logging] level`.
pub fn init_tracing(config: &dyn ConfigPort) {
    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn fail(err: SpotTraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

// --- builders ---------------------------------------------------------------

pub fn build_sizing_config(adapter: &dyn ConfigPort) -> SizingConfig {
    let defaults = SizingConfig::default();
    SizingConfig {
        trade_percentage: adapter.get_double("trading", "trade_percentage", defaults.trade_percentage),
        include_fees: adapter.get_bool("fees", "include_fees", defaults.include_fees),
        fee_buffer_percentage: adapter.get_double(
            "fees",
            "fee_buffer_percentage",
            defaults.fee_buffer_percentage,
        ),
        min_trade_amount: adapter.get_double("trading", "min_trade_amount", defaults.min_trade_amount),
    }
}

pub fn build_fee_schedule(adapter: &dyn ConfigPort) -> FeeSchedule {
    let defaults = FeeSchedule::default();
    FeeSchedule {
        maker_fee_rate: adapter.get_double("fees", "maker_fee_rate", defaults.maker_fee_rate),
        taker_fee_rate: adapter.get_double("fees", "taker_fee_rate", defaults.taker_fee_rate),
    }
}

pub fn build_exit_rules(adapter: &dyn ConfigPort) -> ExitRules {
    let defaults = ExitRules::default();
    ExitRules {
        min_profit_percentage: adapter.get_double(
            "risk",
            "min_profit_percentage",
            defaults.min_profit_percentage,
        ),
        max_position_age_hours: adapter.get_double(
            "risk",
            "max_position_age_hours",
            defaults.max_position_age_hours,
        ),
        stop_loss_percentage: adapter.get_double("risk", "stop_loss_percentage", defaults.stop_loss_percentage),
        min_holding_time_minutes: adapter.get_int(
            "risk",
            "min_holding_time_minutes",
            defaults.min_holding_time_minutes,
        ),
    }
}

pub fn build_exit_guard(adapter: &dyn ConfigPort) -> ExitGuard {
    ExitGuard::new(
        adapter.get_double("risk", "take_profit_percentage", 5.0),
        adapter.get_double("risk", "stop_loss_percentage", ExitRules::default().stop_loss_percentage),
    )
}

pub fn build_crossover(adapter: &dyn ConfigPort) -> CrossoverStrategy {
    let defaults = CrossoverParams::default();
    let params = CrossoverParams {
        short_period: adapter.get_int("strategy", "short_period", defaults.short_period as i64) as usize,
        long_period: adapter.get_int("strategy", "long_period", defaults.long_period as i64) as usize,
    };
    CrossoverStrategy::new(params, build_exit_guard(adapter), build_sizing_config(adapter))
}

pub fn build_rsi_volume(adapter: &dyn ConfigPort) -> RsiVolumeStrategy {
    let defaults = RsiVolumeParams::default();
    let params = RsiVolumeParams {
        rsi_period: adapter.get_int("strategy", "rsi_period", defaults.rsi_period as i64) as usize,
        oversold: adapter.get_double("strategy", "rsi_oversold", defaults.oversold),
        overbought: adapter.get_double("strategy", "rsi_overbought", defaults.overbought),
        volume_period: adapter.get_int("strategy", "volume_period", defaults.volume_period as i64) as usize,
        volume_multiplier: adapter.get_double("strategy", "volume_multiplier", defaults.volume_multiplier),
    };
    let engine = FeeEngine::new(build_fee_schedule(adapter), build_sizing_config(adapter), None);
    RsiVolumeStrategy::new(params, build_exit_guard(adapter), engine)
}

/// A single strategy by mode name. The fused mode has no single strategy.
pub fn build_strategy(adapter: &dyn ConfigPort, mode: &str) -> Result<Box<dyn Strategy>, SpotTraderError> {
    match mode {
        "sma" => Ok(Box::new(build_crossover(adapter))),
        "rsi-volume" => Ok(Box::new(build_rsi_volume(adapter))),
        other => Err(SpotTraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "strategy".into(),
            reason: format!("unknown strategy '{}', expected sma or rsi-volume", other),
        }),
    }
}

pub fn build_signal_source(adapter: &dyn ConfigPort) -> Result<SignalSource, SpotTraderError> {
    let mode = adapter
        .get_string("trading", "strategy")
        .unwrap_or_else(|| "fused".to_string());
    match mode.trim() {
        "fused" => Ok(SignalSource::fused(build_crossover(adapter), build_rsi_volume(adapter))),
        other => {
            build_strategy(adapter, other)
                .map(SignalSource::single)
                .map_err(|_| SpotTraderError::ConfigInvalid {
                    section: "trading".into(),
                    key: "strategy".into(),
                    reason: format!("unknown strategy '{}'", other),
                })
        }
    }
}

fn asset(adapter: &dyn ConfigPort, key: &str, default: &str) -> String {
    adapter
        .get_string("trading", key)
        .map(|a| a.trim().to_uppercase())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn build_trader_config(adapter: &dyn ConfigPort) -> TraderConfig {
    let base = asset(adapter, "base_asset", DEFAULT_BASE_ASSET);
    let quote = asset(adapter, "quote_asset", DEFAULT_QUOTE_ASSET);
    let mut config = TraderConfig::new(&base, &quote);
    config.exit_rules = build_exit_rules(adapter);
    config.default_fees = build_fee_schedule(adapter);
    config.allow_pyramiding = adapter.get_bool("trading", "allow_pyramiding", config.allow_pyramiding);
    config.max_daily_trades = adapter
        .get_int("trading", "max_daily_trades", config.max_daily_trades as i64)
        .max(1) as u32;
    config.poll_interval = Duration::from_secs(
        adapter
            .get_int("trading", "poll_interval_seconds", config.poll_interval.as_secs() as i64)
            .max(1) as u64,
    );
    config
}

pub fn build_backtest_config(adapter: &dyn ConfigPort, symbol: &str) -> BacktestConfig {
    let mut config = BacktestConfig::new(symbol, adapter.get_double("backtest", "initial_balance", 10_000.0));
    config.apply_fees = adapter.get_bool("backtest", "apply_fees", config.apply_fees);
    config.taker_fee_rate = build_fee_schedule(adapter).taker_fee_rate;
    config
}

/// Command-line values that take precedence over `[backtest]`.
#[derive(Debug, Default, Clone)]
pub struct BacktestOverrides {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub limit: Option<usize>,
    pub strategy: Option<String>,
    pub source: Option<String>,
    pub data_dir: Option<PathBuf>,
}

pub fn resolve_backtest_request(overrides: BacktestOverrides, adapter: &dyn ConfigPort) -> BacktestRequest {
    let symbol = overrides
        .symbol
        .or_else(|| adapter.get_string("backtest", "symbol"))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| build_trader_config(adapter).symbol);
    BacktestRequest {
        symbol,
        interval: overrides
            .interval
            .or_else(|| adapter.get_string("backtest", "interval"))
            .unwrap_or_else(|| DEFAULT_INTERVAL.to_string()),
        limit: overrides
            .limit
            .unwrap_or_else(|| adapter.get_int("backtest", "limit", 1000).max(1) as usize),
        strategy: overrides
            .strategy
            .or_else(|| adapter.get_string("backtest", "strategy"))
            .unwrap_or_else(|| "sma".to_string()),
        source: overrides
            .source
            .or_else(|| adapter.get_string("backtest", "source"))
            .unwrap_or_else(|| "csv".to_string()),
        data_dir: overrides
            .data_dir
            .or_else(|| adapter.get_string("backtest", "data_dir").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    }
}

// --- backtest ---------------------------------------------------------------

fn run_backtest(config_path: &PathBuf, overrides: BacktestOverrides, output_path: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_tracing(&adapter);

    for check in [validate_backtest_config, validate_strategy_config, validate_fee_config] {
        if let Err(e) = check(&adapter) {
            return fail(e);
        }
    }

    let request = resolve_backtest_request(overrides, &adapter);
    let mut strategy = match build_strategy(&adapter, &request.strategy) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let bt_config = build_backtest_config(&adapter, &request.symbol);

    match request.source.as_str() {
        "csv" => {
            let data_port = CsvAdapter::new(request.data_dir.clone());
            run_backtest_pipeline(&data_port, strategy.as_mut(), &request, &bt_config, output_path)
        }
        "binance" => {
            #[cfg(feature = "live")]
            {
                let exchange = match build_exchange(&adapter, false) {
                    Ok(e) => e,
                    Err(e) => return fail(e),
                };
                run_backtest_pipeline(&exchange, strategy.as_mut(), &request, &bt_config, output_path)
            }

            #[cfg(not(feature = "live"))]
            {
                eprintln!("error: live feature is required for --source binance");
                ExitCode::from(1)
            }
        }
        other => fail(SpotTraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "source".into(),
            reason: format!("unknown source '{}', expected csv or binance", other),
        }),
    }
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &mut dyn Strategy,
    request: &BacktestRequest,
    bt_config: &BacktestConfig,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    let klines = match data_port.fetch_klines(&request.symbol, &request.interval, Some(request.limit)) {
        Ok(k) => k,
        Err(e) => return fail(e),
    };
    let ticks: Vec<_> = klines.iter().map(|k| k.to_tick(&request.symbol)).collect();

    eprintln!(
        "Running backtest: {} {} candles of {}, strategy {}",
        ticks.len(),
        request.interval,
        request.symbol,
        strategy.name(),
    );

    let result = match backtest_engine::run_backtest(strategy, &ticks, bt_config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print_summary(&result);

    if let Some(output) = output_path {
        let output = output.display().to_string();
        if let Err(e) = CsvReportAdapter.write(&result, &output) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", output);
    }

    ExitCode::SUCCESS
}

pub fn print_summary(result: &BacktestResult) {
    let pnl = result.final_balance - result.initial_balance;
    let stats = &result.stats;
    eprintln!("\n=== Backtest Results ({}) ===", result.symbol);
    eprintln!("Strategy:         {}", result.strategy);
    eprintln!("Initial Balance:  {:.2}", result.initial_balance);
    eprintln!("Final Balance:    {:.2}", result.final_balance);
    eprintln!("Total Return:     {:.2}%", result.total_return);
    eprintln!("Total P&L:        {:+.2}", pnl);
    eprintln!("Total Trades:     {}", result.trades.len());
    eprintln!(
        "Round Trips:      {} ({} won, {} lost)",
        stats.round_trips, stats.trades_won, stats.trades_lost
    );
    eprintln!("Win Rate:         {:.1}%", result.win_rate);
    eprintln!("Max Drawdown:     -{:.2}%", result.max_drawdown);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    if stats.profit_factor.is_finite() {
        eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    } else {
        eprintln!("Profit Factor:    inf");
    }

    if !result.trades.is_empty() {
        eprintln!("\n=== Last Trades ===");
        let skip = result.trades.len().saturating_sub(10);
        for trade in &result.trades[skip..] {
            eprintln!(
                "  {}  {:<4} {:.8} @ {:.2}  fee {:.4}",
                trade.timestamp.format("%Y-%m-%d %H:%M"),
                trade.side,
                trade.quantity,
                trade.price,
                trade.fee,
            );
        }
    }
}

// --- live -------------------------------------------------------------------

#[cfg(feature = "live")]
fn build_exchange(
    adapter: &dyn ConfigPort,
    signed: bool,
) -> Result<crate::adapters::binance::BinanceAdapter, SpotTraderError> {
    use crate::adapters::binance::{BinanceAdapter, BinanceConfig, RequestSigner};

    let mut config = BinanceConfig::new(adapter.get_bool("exchange", "testnet", true));
    if let Some(url) = adapter.get_string("exchange", "base_url").filter(|u| !u.trim().is_empty()) {
        config.base_url = url.trim().trim_end_matches('/').to_string();
    }

    let signer = if signed {
        let _ = dotenv::dotenv();
        let credential = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SpotTraderError::ConfigMissing {
                    section: "exchange".into(),
                    key: key.into(),
                })
        };
        Some(RequestSigner::new(
            credential("BINANCE_API_KEY")?,
            credential("BINANCE_SECRET_KEY")?,
        ))
    } else {
        None
    };

    BinanceAdapter::new(config, signer)
}

#[cfg(feature = "sqlite")]
fn open_store(
    adapter: &dyn ConfigPort,
) -> Result<Option<Box<dyn crate::ports::position_store::PositionStore>>, SpotTraderError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    if adapter.get_string("store", "path").is_none() {
        return Ok(None);
    }
    let store = SqliteAdapter::from_config(adapter)?;
    store.initialize_schema()?;
    Ok(Some(Box::new(store)))
}

#[cfg(not(feature = "sqlite"))]
fn open_store(
    _adapter: &dyn ConfigPort,
) -> Result<Option<Box<dyn crate::ports::position_store::PositionStore>>, SpotTraderError> {
    Ok(None)
}

/// Renders orchestrator events until every sender is dropped.
pub fn spawn_event_logger(events: flume::Receiver<TraderEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in events.iter() {
            log_event(&event);
        }
    })
}

pub fn log_event(event: &TraderEvent) {
    match event {
        TraderEvent::Started {
            symbol,
            strategy,
            fees,
            rules,
        } => {
            tracing::info!(
                %symbol,
                %strategy,
                maker = fees.maker_fee_rate,
                taker = fees.taker_fee_rate,
                "trader started"
            );
            match rules {
                Some(r) => tracing::info!(
                    step_size = r.step_size,
                    min_qty = r.min_qty,
                    min_notional = r.min_notional,
                    "symbol rules loaded"
                ),
                None => tracing::warn!("symbol rules unavailable, orders are not pre-validated"),
            }
        }
        TraderEvent::WarmedUp { candles } => tracing::info!(candles, "indicators warmed up"),
        TraderEvent::WarmUpFailed { reason } => {
            tracing::warn!(%reason, "warm-up failed, building history from live ticks")
        }
        TraderEvent::PositionRestored(pos) => tracing::info!(
            quantity = pos.quantity,
            entry_price = pos.entry_price,
            entry_time = %pos.entry_time,
            "position restored"
        ),
        TraderEvent::Reconciled(outcome) => match outcome {
            Reconciliation::Capped { from, to } => {
                tracing::warn!(from, to, "position capped to wallet balance")
            }
            Reconciliation::Cleared { quantity } => {
                tracing::warn!(quantity, "position cleared, wallet holds only dust")
            }
            Reconciliation::Unchanged => {}
        },
        TraderEvent::TickObserved {
            symbol,
            price,
            readings,
            ..
        } => tracing::info!(%symbol, price, %readings, "tick"),
        TraderEvent::SignalEvaluated(decision) => tracing::debug!(
            action = ?decision.action,
            strength = %decision.strength,
            "signal evaluated"
        ),
        TraderEvent::HeldByMinHolding { holding_minutes } => {
            tracing::info!(holding_minutes, "sell held by minimum holding time")
        }
        TraderEvent::ForcedExit(reason) => tracing::warn!(%reason, "forced exit"),
        TraderEvent::OrderSkipped { side, reason } => tracing::info!(%side, %reason, "order skipped"),
        TraderEvent::OrderExecuted(trade) => tracing::info!(
            side = %trade.side,
            quantity = trade.quantity,
            price = trade.price,
            fee = trade.fee,
            "order executed"
        ),
        TraderEvent::PositionOpened(pos) => {
            tracing::info!(quantity = pos.quantity, entry_price = pos.entry_price, "position opened")
        }
        TraderEvent::PositionIncreased(pos) => {
            tracing::info!(quantity = pos.quantity, entry_price = pos.entry_price, "position increased")
        }
        TraderEvent::PositionClosed { position, pnl } => {
            tracing::info!(quantity = position.quantity, pnl, "position closed")
        }
        TraderEvent::DailyLimitReached { trades, limit } => {
            tracing::warn!(trades, limit, "daily trade limit reached")
        }
        TraderEvent::NewTradingDay { previous_trades } => {
            tracing::info!(previous_trades, "new trading day")
        }
        TraderEvent::TickAborted { reason } => tracing::error!(%reason, "tick aborted"),
        TraderEvent::StoreFailed { reason } => tracing::error!(%reason, "position store failed"),
        TraderEvent::Stopped(stats) => tracing::info!(
            trades = stats.total_trades,
            pnl = stats.total_pnl,
            win_rate = stats.win_rate(),
            "trader stopped"
        ),
    }
}

/// Forward Ctrl-C into `stop`. The listener keeps the sender alive while it
/// waits.
#[cfg(feature = "live")]
fn spawn_ctrl_c_listener(stop: flume::Sender<()>) -> Result<(), SpotTraderError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = stop.send(());
            }
        });
    });
    Ok(())
}

fn run_trade(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    init_tracing(&adapter);

    if let Err(e) = validate_live_config(&adapter) {
        return fail(e);
    }

    #[cfg(feature = "live")]
    {
        use crate::domain::trader::Trader;

        let exchange = match build_exchange(&adapter, true) {
            Ok(e) => e,
            Err(e) => return fail(e),
        };
        let source = match build_signal_source(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };
        let store = match open_store(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };
        let config = build_trader_config(&adapter);
        eprintln!(
            "Trading {} with {} every {}s",
            config.symbol,
            source.name(),
            config.poll_interval.as_secs()
        );

        let (events_tx, events_rx) = flume::unbounded();
        let logger = spawn_event_logger(events_rx);

        let mut trader = Trader::new(exchange, source, config, events_tx);
        if let Some(store) = store {
            trader = trader.with_store(store);
        }

        let outcome = trader.startup().and_then(|()| {
            let (stop_tx, stop_rx) = flume::bounded(1);
            spawn_ctrl_c_listener(stop_tx)?;
            Ok(trader.run(&stop_rx))
        });
        drop(trader);
        let _ = logger.join();

        match outcome {
            Ok(stats) => {
                eprintln!("\n=== Session Summary ===");
                eprintln!("Total Trades:     {}", stats.total_trades);
                eprintln!("Closed Trades:    {}", stats.closed_trades);
                eprintln!("Win Rate:         {:.1}%", stats.win_rate());
                eprintln!("Realized P&L:     {:+.2}", stats.total_pnl);
                eprintln!(
                    "Signals:          {} strong, {} moderate, {} conservative",
                    stats.strong_signals, stats.moderate_signals, stats.conservative_signals
                );
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "live"))]
    {
        let _ = open_store;
        eprintln!("error: live feature is required for trade");
        ExitCode::from(1)
    }
}

// --- data -------------------------------------------------------------------

fn run_download(
    symbol: &str,
    interval: &str,
    limit: usize,
    data_dir: &Path,
    config_path: Option<&PathBuf>,
) -> ExitCode {
    #[cfg(feature = "live")]
    {
        let adapter = match config_path {
            Some(path) => match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            },
            None => match FileConfigAdapter::from_string("") {
                Ok(a) => a,
                Err(reason) => {
                    return fail(SpotTraderError::ConfigParse {
                        file: "<empty>".into(),
                        reason,
                    });
                }
            },
        };
        let exchange = match build_exchange(&adapter, false) {
            Ok(e) => e,
            Err(e) => return fail(e),
        };

        let symbol = symbol.to_uppercase();
        let klines = match exchange.fetch_klines(&symbol, interval, Some(limit)) {
            Ok(k) => k,
            Err(e) => return fail(e),
        };
        match CsvAdapter::new(data_dir.to_path_buf()).write_klines(&symbol, interval, &klines) {
            Ok(path) => {
                eprintln!("{} klines written to {}", klines.len(), path.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        }
    }

    #[cfg(not(feature = "live"))]
    {
        let _ = (symbol, interval, limit, data_dir, config_path);
        eprintln!("error: live feature is required for download");
        ExitCode::from(1)
    }
}

fn run_list_symbols(data_dir: &Path, interval: &str) -> ExitCode {
    let symbols = match CsvAdapter::new(data_dir.to_path_buf()).list_symbols(interval) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No {} data found in {}", interval, data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_live_config(&adapter).and_then(|()| validate_backtest_config(&adapter)) {
        return fail(e);
    }

    let trader = build_trader_config(&adapter);
    let sizing = build_sizing_config(&adapter);
    let rules = trader.exit_rules;
    let strategy = adapter
        .get_string("trading", "strategy")
        .unwrap_or_else(|| "fused".to_string());

    eprintln!("\nTrading:");
    eprintln!("  symbol:           {}", trader.symbol);
    eprintln!("  strategy:         {}", strategy);
    eprintln!("  trade percentage: {}%", sizing.trade_percentage);
    eprintln!("  max daily trades: {}", trader.max_daily_trades);
    eprintln!("  poll interval:    {}s", trader.poll_interval.as_secs());
    eprintln!("  pyramiding:       {}", trader.allow_pyramiding);
    eprintln!("\nRisk:");
    eprintln!("  stop loss:        {}%", rules.stop_loss_percentage);
    eprintln!("  min profit:       {}%", rules.min_profit_percentage);
    eprintln!("  min holding:      {} min", rules.min_holding_time_minutes);
    eprintln!("  max age:          {} h", rules.max_position_age_hours);
    eprintln!("\nFees:");
    eprintln!(
        "  maker/taker:      {}/{}",
        trader.default_fees.maker_fee_rate, trader.default_fees.taker_fee_rate
    );
    eprintln!("  include fees:     {}", sizing.include_fees);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
