//! Round-trip performance statistics.

use super::trade::RoundTrip;

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub round_trips: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    /// Percentage of winning round trips, 0 when there are none.
    pub win_rate: f64,
    pub total_pnl: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_hours: f64,
    pub sharpe_ratio: f64,
}

impl TradeStats {
    pub fn compute(trips: &[RoundTrip]) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_holding_minutes = 0i64;

        for trip in trips {
            let pnl = trip.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                trades_breakeven += 1;
            }
            total_holding_minutes += (trip.exit_time - trip.entry_time).num_minutes();
        }

        let round_trips = trips.len();
        let win_rate = if round_trips > 0 {
            trades_won as f64 / round_trips as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_holding_hours = if round_trips > 0 {
            total_holding_minutes as f64 / 60.0 / round_trips as f64
        } else {
            0.0
        };

        let pnls: Vec<f64> = trips.iter().map(|t| t.pnl).collect();

        TradeStats {
            round_trips,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            total_pnl: pnls.iter().sum(),
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_hours,
            sharpe_ratio: sharpe_ratio(&pnls),
        }
    }
}

/// Mean over sample standard deviation (ddof = 1) of per-trade P&L.
/// 0 with fewer than two values or zero variance.
pub fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let n = pnls.len() as f64;
    let mean = pnls.iter().sum::<f64>() / n;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    if variance <= 0.0 {
        return 0.0;
    }
    mean / variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn trip(pnl: f64, hours: i64) -> RoundTrip {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RoundTrip {
            symbol: "BTCBRL".into(),
            quantity: 1.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            entry_time: entry,
            exit_time: entry + Duration::hours(hours),
            pnl,
        }
    }

    #[test]
    fn empty_trips_are_all_zero() {
        let stats = TradeStats::compute(&[]);
        assert_eq!(stats.round_trips, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
        assert!(!stats.win_rate.is_nan());
    }

    #[test]
    fn mixed_trips() {
        let trips = vec![trip(10.0, 2), trip(-5.0, 4), trip(20.0, 6), trip(0.0, 0)];
        let stats = TradeStats::compute(&trips);
        assert_eq!(stats.trades_won, 2);
        assert_eq!(stats.trades_lost, 1);
        assert_eq!(stats.trades_breakeven, 1);
        assert_relative_eq!(stats.win_rate, 50.0);
        assert_relative_eq!(stats.total_pnl, 25.0);
        assert_relative_eq!(stats.profit_factor, 6.0);
        assert_relative_eq!(stats.avg_win, 15.0);
        assert_relative_eq!(stats.avg_loss, 5.0);
        assert_relative_eq!(stats.largest_win, 20.0);
        assert_relative_eq!(stats.largest_loss, 5.0);
        assert_relative_eq!(stats.avg_holding_hours, 3.0);
    }

    #[test]
    fn only_wins_is_infinite_profit_factor() {
        let stats = TradeStats::compute(&[trip(1.0, 1)]);
        assert!(stats.profit_factor.is_infinite());
    }

    #[test]
    fn sharpe_uses_sample_stdev() {
        // mean 2, sample variance ((1)^2 + 0 + (1)^2) / 2 = 1
        assert_relative_eq!(sharpe_ratio(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn sharpe_degenerate_cases() {
        assert_eq!(sharpe_ratio(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[5.0]), 0.0);
        assert_eq!(sharpe_ratio(&[3.0, 3.0, 3.0]), 0.0);
    }
}
