//! Historical replay of a single strategy.
//!
//! Per tick: feed the strategy, then buy if it says buy, otherwise sell if it
//! says sell. A buy needs a positive size, no open holding and enough cash; a
//! sell needs a holding. Equity is marked to market after every tick.

use chrono::{DateTime, Utc};

use super::error::SpotTraderError;
use super::metrics::TradeStats;
use super::strategy::Strategy;
use super::tick::{MarketTick, WalletBalances};
use super::trade::{RoundTrip, Side, Trade, match_sell};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub initial_balance: f64,
    /// Charge the taker fee on every simulated fill.
    pub apply_fees: bool,
    pub taker_fee_rate: f64,
}

impl BacktestConfig {
    pub fn new(symbol: &str, initial_balance: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            initial_balance,
            apply_fees: false,
            taker_fee_rate: 0.001,
        }
    }

    fn fee_on(&self, value: f64) -> f64 {
        if self.apply_fees {
            value * self.taker_fee_rate
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: String,
    pub trades: Vec<Trade>,
    pub round_trips: Vec<RoundTrip>,
    pub equity_curve: Vec<EquityPoint>,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub stats: TradeStats,
}

struct Holding {
    quantity: f64,
}

pub fn run_backtest(
    strategy: &mut dyn Strategy,
    ticks: &[MarketTick],
    config: &BacktestConfig,
) -> Result<BacktestResult, SpotTraderError> {
    if ticks.is_empty() {
        return Err(SpotTraderError::EmptySeries {
            symbol: config.symbol.clone(),
        });
    }

    let mut cash = config.initial_balance;
    let mut holding: Option<Holding> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut round_trips: Vec<RoundTrip> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(ticks.len());
    let mut peak = config.initial_balance;
    let mut max_drawdown = 0.0_f64;

    for tick in ticks {
        strategy.on_tick(tick);

        if strategy.should_buy(tick) {
            let held = holding.as_ref().map_or(0.0, |h| h.quantity);
            let wallet = WalletBalances::new(cash, held);
            let quantity = strategy.calculate_position_size(tick, &wallet);
            let value = quantity * tick.price;
            let fee = config.fee_on(value);

            if quantity > 0.0 && holding.is_none() && cash >= value + fee {
                cash -= value + fee;
                holding = Some(Holding { quantity });
                let trade = Trade {
                    symbol: config.symbol.clone(),
                    side: Side::Buy,
                    quantity,
                    price: tick.price,
                    timestamp: tick.timestamp,
                    fee,
                };
                strategy.on_fill(&trade);
                trades.push(trade);
            }
        } else if strategy.should_sell(tick) {
            if let Some(h) = holding.take() {
                let value = h.quantity * tick.price;
                let fee = config.fee_on(value);
                cash += value - fee;
                let trade = Trade {
                    symbol: config.symbol.clone(),
                    side: Side::Sell,
                    quantity: h.quantity,
                    price: tick.price,
                    timestamp: tick.timestamp,
                    fee,
                };
                strategy.on_fill(&trade);
                trades.push(trade);
                if let Some(trip) = match_sell(&trades, trades.len() - 1) {
                    round_trips.push(trip);
                }
            }
        }

        let equity = cash + holding.as_ref().map_or(0.0, |h| h.quantity * tick.price);
        equity_curve.push(EquityPoint {
            timestamp: tick.timestamp,
            equity,
        });

        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }

    let final_balance = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(config.initial_balance);

    let total_return = if config.initial_balance > 0.0 {
        (final_balance - config.initial_balance) / config.initial_balance * 100.0
    } else {
        0.0
    };

    let stats = TradeStats::compute(&round_trips);

    Ok(BacktestResult {
        symbol: config.symbol.clone(),
        strategy: strategy.name().to_string(),
        trades,
        round_trips,
        equity_curve,
        initial_balance: config.initial_balance,
        final_balance,
        total_return,
        win_rate: stats.win_rate,
        max_drawdown: max_drawdown * 100.0,
        sharpe_ratio: stats.sharpe_ratio,
        stats,
    })
}
