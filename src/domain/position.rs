//! The single open holding and its derived profit / holding-time reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SpotTraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub fees_paid: f64,
}

impl Position {
    pub fn new(symbol: &str, quantity: f64, entry_price: f64, entry_time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            entry_price,
            entry_time,
            fees_paid: 0.0,
        }
    }

    pub fn entry_value(&self) -> f64 {
        self.quantity * self.entry_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Net profit if sold at `price`, after fees paid so far and the
    /// estimated sell fee.
    pub fn net_profit(&self, price: f64, sell_fee_rate: f64) -> f64 {
        let current_value = self.market_value(price);
        let sell_fee = current_value * sell_fee_rate;
        current_value - self.entry_value() - self.fees_paid - sell_fee
    }

    pub fn profit_percentage(&self, price: f64, sell_fee_rate: f64) -> f64 {
        let entry_value = self.entry_value();
        if entry_value <= 0.0 {
            return 0.0;
        }
        self.net_profit(price, sell_fee_rate) / entry_value * 100.0
    }

    /// Whole minutes since entry, truncated.
    pub fn holding_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_minutes()
    }

    pub fn holding_hours(&self, now: DateTime<Utc>) -> f64 {
        self.holding_minutes(now) as f64 / 60.0
    }

    pub fn should_sell_for_profit(&self, price: f64, min_profit_pct: f64, sell_fee_rate: f64) -> bool {
        self.profit_percentage(price, sell_fee_rate) >= min_profit_pct
    }

    pub fn should_sell_for_time(&self, now: DateTime<Utc>, max_age_hours: f64) -> bool {
        self.holding_hours(now) >= max_age_hours
    }

    pub fn should_sell_for_stop_loss(&self, price: f64, stop_loss_pct: f64, sell_fee_rate: f64) -> bool {
        self.profit_percentage(price, sell_fee_rate) <= -stop_loss_pct
    }

    /// Merge an additional buy. Entry price becomes the volume-weighted
    /// average; entry time is kept.
    pub fn add_fill(&mut self, quantity: f64, price: f64, fee: f64) {
        let total_quantity = self.quantity + quantity;
        if total_quantity > 0.0 {
            self.entry_price = (self.entry_value() + quantity * price) / total_quantity;
        }
        self.quantity = total_quantity;
        self.fees_paid += fee;
    }

    pub fn to_record(&self) -> PositionRecord {
        PositionRecord {
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            entry_price: self.entry_price,
            entry_time: self.entry_time.to_rfc3339(),
            fees_paid: self.fees_paid,
        }
    }

    pub fn from_record(record: &PositionRecord) -> Result<Self, SpotTraderError> {
        let entry_time = DateTime::parse_from_rfc3339(&record.entry_time)
            .map_err(|e| SpotTraderError::Store {
                reason: format!("invalid entry time '{}': {}", record.entry_time, e),
            })?
            .with_timezone(&Utc);

        if record.quantity <= 0.0 {
            return Err(SpotTraderError::Store {
                reason: format!("stored position for {} has quantity {}", record.symbol, record.quantity),
            });
        }

        Ok(Position {
            symbol: record.symbol.clone(),
            quantity: record.quantity,
            entry_price: record.entry_price,
            entry_time,
            fees_paid: record.fees_paid,
        })
    }
}

/// Persisted form of a position; `entry_time` is ISO-8601.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: String,
    #[serde(default)]
    pub fees_paid: f64,
}
