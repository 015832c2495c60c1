//! Executed trades and round-trip P&L matching.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Append-only execution record.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub fee: f64,
}

impl Trade {
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }
}

/// A sell matched against the buy that opened it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
}

impl RoundTrip {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Match the sell at `sell_index` with the nearest earlier buy of the same
/// symbol. Returns `None` if the index is not a sell or no buy precedes it.
///
/// pnl = sell value - buy value - fees of both fills
pub fn match_sell(trades: &[Trade], sell_index: usize) -> Option<RoundTrip> {
    let sell = trades.get(sell_index)?;
    if sell.side != Side::Sell {
        return None;
    }

    let buy = trades[..sell_index]
        .iter()
        .rev()
        .find(|t| t.side == Side::Buy && t.symbol == sell.symbol)?;

    Some(RoundTrip {
        symbol: sell.symbol.clone(),
        quantity: sell.quantity,
        entry_price: buy.price,
        exit_price: sell.price,
        entry_time: buy.timestamp,
        exit_time: sell.timestamp,
        pnl: sell.value() - buy.value() - buy.fee - sell.fee,
    })
}

/// Every matched round trip in trade order.
pub fn round_trips(trades: &[Trade]) -> Vec<RoundTrip> {
    (0..trades.len())
        .filter_map(|i| match_sell(trades, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(symbol: &str, side: Side, quantity: f64, price: f64, hour: u32) -> Trade {
        Trade {
            symbol: symbol.into(),
            side,
            quantity,
            price,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            fee: 0.0,
        }
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Buy.to_string(), "BUY");
        assert_eq!(Side::Sell.to_string(), "SELL");
    }

    #[test]
    fn trade_value() {
        let t = trade("BTCBRL", Side::Buy, 0.5, 200.0, 0);
        assert!((t.value() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_matches_nearest_prior_buy() {
        let trades = vec![
            trade("BTCBRL", Side::Buy, 1.0, 100.0, 0),
            trade("BTCBRL", Side::Sell, 1.0, 110.0, 1),
            trade("BTCBRL", Side::Buy, 1.0, 120.0, 2),
            trade("BTCBRL", Side::Sell, 1.0, 115.0, 3),
        ];
        let trips = round_trips(&trades);
        assert_eq!(trips.len(), 2);
        assert!((trips[0].pnl - 10.0).abs() < 1e-9);
        assert!((trips[1].pnl - (-5.0)).abs() < 1e-9);
        assert!(trips[0].is_win());
        assert!(!trips[1].is_win());
    }

    #[test]
    fn sell_ignores_other_symbols() {
        let trades = vec![
            trade("BTCBRL", Side::Buy, 1.0, 100.0, 0),
            trade("ETHBRL", Side::Buy, 1.0, 10.0, 1),
            trade("BTCBRL", Side::Sell, 1.0, 105.0, 2),
        ];
        let trip = match_sell(&trades, 2).unwrap();
        assert!((trip.entry_price - 100.0).abs() < f64::EPSILON);
        assert!((trip.pnl - 5.0).abs() < 1e-9);
    }

    #[test]
    fn fees_reduce_pnl() {
        let mut buy = trade("BTCBRL", Side::Buy, 1.0, 100.0, 0);
        buy.fee = 0.1;
        let mut sell = trade("BTCBRL", Side::Sell, 1.0, 110.0, 1);
        sell.fee = 0.11;
        let trip = match_sell(&[buy, sell], 1).unwrap();
        assert!((trip.pnl - 9.79).abs() < 1e-9);
    }

    #[test]
    fn unmatched_sell_and_buy_index() {
        let trades = vec![
            trade("BTCBRL", Side::Sell, 1.0, 100.0, 0),
            trade("BTCBRL", Side::Buy, 1.0, 100.0, 1),
        ];
        assert!(match_sell(&trades, 0).is_none());
        assert!(match_sell(&trades, 1).is_none());
        assert!(match_sell(&trades, 5).is_none());
        assert!(round_trips(&trades).is_empty());
    }
}
