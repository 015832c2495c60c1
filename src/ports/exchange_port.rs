//! Spot exchange port: quotes, balances, symbol filters and market orders.

use crate::domain::error::SpotTraderError;
use crate::domain::sizing::{FeeSchedule, SymbolRules};
use crate::domain::tick::{Kline, MarketTick};
use crate::domain::trade::Side;

/// One partial execution of a market order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub commission_asset: String,
}

/// Exchange acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: u64,
    pub status: String,
    pub fills: Vec<OrderFill>,
}

impl OrderAck {
    pub fn executed_quantity(&self) -> f64 {
        self.fills.iter().map(|f| f.quantity).sum()
    }

    /// Volume-weighted fill price, or `fallback` when nothing was reported.
    pub fn average_price(&self, fallback: f64) -> f64 {
        let quantity = self.executed_quantity();
        if quantity <= 0.0 {
            return fallback;
        }
        self.fills.iter().map(|f| f.price * f.quantity).sum::<f64>() / quantity
    }

    /// Commission paid in `asset`.
    pub fn commission_in(&self, asset: &str) -> f64 {
        self.fills
            .iter()
            .filter(|f| f.commission_asset == asset)
            .map(|f| f.commission)
            .sum()
    }
}

pub trait ExchangePort {
    /// Last price plus 24h statistics of `symbol`.
    fn get_tick(&self, symbol: &str) -> Result<MarketTick, SpotTraderError>;

    fn get_price(&self, symbol: &str) -> Result<f64, SpotTraderError>;

    fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Kline>, SpotTraderError>;

    /// Free balance of `asset`, 0 when the account does not hold it.
    fn get_balance(&self, asset: &str) -> Result<f64, SpotTraderError>;

    fn get_symbol_rules(&self, symbol: &str) -> Result<SymbolRules, SpotTraderError>;

    fn get_fee_schedule(&self) -> Result<FeeSchedule, SpotTraderError>;

    /// Market order. Non-2xx responses are `ExchangeRejection`.
    fn place_order(&self, symbol: &str, side: Side, quantity: f64) -> Result<OrderAck, SpotTraderError>;
}
