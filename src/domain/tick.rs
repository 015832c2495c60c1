//! Market snapshots: live ticks, historical klines and wallet balances.

use chrono::{DateTime, Utc};

/// Immutable market snapshot produced once per poll or replay step.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketTick {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub timestamp: DateTime<Utc>,
}

/// One candlestick as returned by the exchange or read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
}

impl Kline {
    /// Replay view of the candle: the close becomes the tick price.
    pub fn to_tick(&self, symbol: &str) -> MarketTick {
        MarketTick {
            symbol: symbol.to_string(),
            price: self.close,
            volume: self.volume,
            quote_volume: self.quote_volume,
            high_24h: self.high,
            low_24h: self.low,
            timestamp: self.open_time,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Free balances of the two assets of the traded pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WalletBalances {
    pub quote: f64,
    pub base: f64,
}

impl WalletBalances {
    pub fn new(quote: f64, base: f64) -> Self {
        Self { quote, base }
    }

    /// quote + base marked at `price`
    pub fn total_value(&self, price: f64) -> f64 {
        self.quote + self.base * price
    }
}
