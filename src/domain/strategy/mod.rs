//! Strategy signals.
//!
//! A strategy is fed every tick through `on_tick`, then answers
//! `should_buy` / `should_sell` for that tick without further mutation.
//! Sizing is a separate capability, `FeeAwareSizing`, whose default methods
//! give the plain percentage-of-wallet path; strategies that know the fee
//! schedule and lot-size rules override it.

pub mod crossover;
pub mod rsi_volume;

pub use crossover::{CrossoverParams, CrossoverStrategy};
pub use rsi_volume::{RsiVolumeParams, RsiVolumeStrategy};

use super::error::OrderViolation;
use super::indicator::IndicatorReadings;
use super::sizing::{FeeSchedule, OrderSize, SizingConfig, SizingRejection, SymbolRules, plain_position_size};
use super::tick::{Kline, MarketTick, WalletBalances};
use super::trade::{Side, Trade};

/// Order sizing capability shared by every strategy.
pub trait FeeAwareSizing {
    fn sizing_config(&self) -> &SizingConfig;

    fn position_size(&self, tick: &MarketTick, wallet: &WalletBalances) -> Result<OrderSize, SizingRejection> {
        plain_position_size(tick, wallet, self.sizing_config())
    }

    /// Quantity to actually sell when `requested` is wanted and `available`
    /// is held.
    fn sell_quantity(&self, requested: f64, available: f64) -> f64 {
        requested.min(available)
    }

    fn check_order(&self, _quantity: f64, _price: f64) -> Result<(), OrderViolation> {
        Ok(())
    }

    /// Account fee schedule and symbol filters fetched at startup.
    fn configure_exchange(&mut self, _fees: FeeSchedule, _rules: Option<SymbolRules>) {}
}

pub trait Strategy: FeeAwareSizing + Send {
    fn name(&self) -> &str;

    /// Number of historical candles needed to fill every indicator window.
    fn required_history(&self) -> usize;

    /// Seed indicator windows from historical candles.
    fn warm_up(&mut self, klines: &[Kline]) {
        for kline in klines {
            self.on_tick(&kline.to_tick(""));
        }
    }

    fn on_tick(&mut self, tick: &MarketTick);

    fn should_buy(&self, tick: &MarketTick) -> bool;

    fn should_sell(&self, tick: &MarketTick) -> bool;

    /// Notification of an executed fill.
    fn on_fill(&mut self, _trade: &Trade) {}

    fn readings(&self) -> IndicatorReadings;

    /// Buy quantity for this tick, 0 when sizing is rejected.
    fn calculate_position_size(&self, tick: &MarketTick, wallet: &WalletBalances) -> f64 {
        self.position_size(tick, wallet)
            .map(|size| size.quantity)
            .unwrap_or(0.0)
    }
}

/// Take-profit / stop-loss guard on the entry price of the latest buy fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitGuard {
    pub take_profit_percentage: f64,
    pub stop_loss_percentage: f64,
    entry_price: Option<f64>,
}

impl ExitGuard {
    pub fn new(take_profit_percentage: f64, stop_loss_percentage: f64) -> Self {
        Self {
            take_profit_percentage,
            stop_loss_percentage,
            entry_price: None,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn on_fill(&mut self, trade: &Trade) {
        match trade.side {
            Side::Buy => self.entry_price = Some(trade.price),
            Side::Sell => self.entry_price = None,
        }
    }

    pub fn triggered(&self, price: f64) -> bool {
        let Some(entry) = self.entry_price else {
            return false;
        };
        if entry <= 0.0 {
            return false;
        }
        let change = (price - entry) * 100.0 / entry;
        change <= -self.stop_loss_percentage || change >= self.take_profit_percentage
    }
}
