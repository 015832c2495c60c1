//! Wire types of the spot REST API. Decimal values arrive as strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::sizing::SymbolRules;
use crate::domain::tick::Kline;
use crate::ports::exchange_port::{OrderAck, OrderFill};

fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    #[serde(deserialize_with = "de_f64")]
    pub last_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub volume: f64,
    #[serde(deserialize_with = "de_f64")]
    pub quote_volume: f64,
    #[serde(deserialize_with = "de_f64")]
    pub high_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub low_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub asset: String,
    #[serde(deserialize_with = "de_f64")]
    pub free: f64,
}

#[derive(Debug, Deserialize)]
pub struct CommissionRates {
    #[serde(deserialize_with = "de_f64")]
    pub maker: f64,
    #[serde(deserialize_with = "de_f64")]
    pub taker: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Basis points: 10 means 0.1 %.
    #[serde(default)]
    pub maker_commission: Option<f64>,
    #[serde(default)]
    pub taker_commission: Option<f64>,
    #[serde(default)]
    pub commission_rates: Option<CommissionRates>,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    pub fn free(&self, asset: &str) -> f64 {
        self.balances
            .iter()
            .find(|b| b.asset == asset)
            .map_or(0.0, |b| b.free)
    }

    /// (maker, taker) as fractions.
    pub fn fee_rates(&self) -> Option<(f64, f64)> {
        if let Some(rates) = &self.commission_rates {
            return Some((rates.maker, rates.taker));
        }
        match (self.maker_commission, self.taker_commission) {
            (Some(maker), Some(taker)) => Some((maker / 10_000.0, taker / 10_000.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(deserialize_with = "de_f64")]
        min_qty: f64,
        #[serde(deserialize_with = "de_f64")]
        max_qty: f64,
        #[serde(deserialize_with = "de_f64")]
        step_size: f64,
    },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional {
        #[serde(deserialize_with = "de_f64")]
        min_notional: f64,
    },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional {
        #[serde(deserialize_with = "de_f64")]
        min_notional: f64,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    /// `None` without a positive LOT_SIZE step.
    pub fn rules(&self) -> Option<SymbolRules> {
        let mut rules: Option<SymbolRules> = None;
        let mut min_notional = 0.0;
        for filter in &self.filters {
            match filter {
                SymbolFilter::LotSize {
                    min_qty,
                    max_qty,
                    step_size,
                } if *step_size > 0.0 => {
                    rules = Some(SymbolRules {
                        step_size: *step_size,
                        min_qty: *min_qty,
                        max_qty: *max_qty,
                        min_notional: 0.0,
                    });
                }
                SymbolFilter::Notional { min_notional: n } | SymbolFilter::MinNotional { min_notional: n } => {
                    min_notional = *n;
                }
                _ => {}
            }
        }
        rules.map(|r| SymbolRules { min_notional, ..r })
    }
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub qty: f64,
    #[serde(deserialize_with = "de_f64")]
    pub commission: f64,
    pub commission_asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: u64,
    pub status: String,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl From<OrderResponse> for OrderAck {
    fn from(response: OrderResponse) -> Self {
        OrderAck {
            order_id: response.order_id,
            status: response.status,
            fills: response
                .fills
                .into_iter()
                .map(|f| OrderFill {
                    price: f.price,
                    quantity: f.qty,
                    commission: f.commission,
                    commission_asset: f.commission_asset,
                })
                .collect(),
        }
    }
}

fn value_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume, ...]`
pub fn kline_from_row(row: &[serde_json::Value]) -> Option<Kline> {
    let open_time = DateTime::<Utc>::from_timestamp_millis(row.first()?.as_i64()?)?;
    Some(Kline {
        open_time,
        open: value_f64(row.get(1)?)?,
        high: value_f64(row.get(2)?)?,
        low: value_f64(row.get(3)?)?,
        close: value_f64(row.get(4)?)?,
        volume: value_f64(row.get(5)?)?,
        quote_volume: value_f64(row.get(7)?)?,
    })
}
