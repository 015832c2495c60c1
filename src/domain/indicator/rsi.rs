//! RSI (Relative Strength Index) over a rolling price window.
//!
//! Simple averages of the last `period` gains and losses:
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Returns the neutral 50 until `period + 1` prices are held, and 100 when
//! there were no losses in the window.

use std::collections::VecDeque;

pub const NEUTRAL_RSI: f64 = 50.0;
pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    oversold: f64,
    overbought: f64,
    window: VecDeque<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self::with_thresholds(period, DEFAULT_OVERSOLD, DEFAULT_OVERBOUGHT)
    }

    pub fn with_thresholds(period: usize, oversold: f64, overbought: f64) -> Self {
        Self {
            period,
            oversold,
            overbought,
            window: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn push(&mut self, price: f64) {
        self.window.push_back(price);
        while self.window.len() > self.period + 1 {
            self.window.pop_front();
        }
    }

    pub fn calculate(&self) -> f64 {
        if self.period == 0 || self.window.len() < self.period + 1 {
            return NEUTRAL_RSI;
        }

        let mut gains = 0.0;
        let mut losses = 0.0;
        for (prev, curr) in self.window.iter().zip(self.window.iter().skip(1)) {
            let change = curr - prev;
            if change > 0.0 {
                gains += change;
            } else {
                losses += -change;
            }
        }

        let avg_gain = gains / self.period as f64;
        let avg_loss = losses / self.period as f64;

        if avg_loss == 0.0 {
            return 100.0;
        }

        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    pub fn is_oversold(&self) -> bool {
        self.calculate() < self.oversold
    }

    pub fn is_overbought(&self) -> bool {
        self.calculate() > self.overbought
    }

    pub fn oversold_threshold(&self) -> f64 {
        self.oversold
    }

    pub fn overbought_threshold(&self) -> f64 {
        self.overbought
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rsi_of(period: usize, prices: &[f64]) -> Rsi {
        let mut rsi = Rsi::new(period);
        for &p in prices {
            rsi.push(p);
        }
        rsi
    }

    #[test]
    fn neutral_until_period_plus_one() {
        let rsi = rsi_of(14, &[100.0; 14]);
        assert_eq!(rsi.calculate(), NEUTRAL_RSI);
    }

    #[test]
    fn all_gains_is_one_hundred() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi_of(14, &prices).calculate(), 100.0);
    }

    #[test]
    fn flat_prices_is_one_hundred() {
        assert_eq!(rsi_of(5, &[42.0; 6]).calculate(), 100.0);
    }

    #[test]
    fn all_losses_is_zero() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let value = rsi_of(14, &prices).calculate();
        assert!(value.abs() < 1e-12);
        assert!(rsi_of(14, &prices).is_oversold());
    }

    #[test]
    fn known_mixed_window() {
        // changes: +2, -1, +2, -1 -> avg_gain 1.0, avg_loss 0.5, RS 2
        let value = rsi_of(4, &[10.0, 12.0, 11.0, 13.0, 12.0]).calculate();
        assert!((value - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn window_only_uses_last_period_changes() {
        // An early crash falls out of the window once enough gains follow.
        let value = rsi_of(3, &[100.0, 10.0, 11.0, 12.0, 13.0]).calculate();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn custom_thresholds() {
        let prices: Vec<f64> = (0..6).map(|i| 100.0 + i as f64).collect();
        let mut rsi = Rsi::with_thresholds(5, 20.0, 99.0);
        for p in prices {
            rsi.push(p);
        }
        assert!(rsi.is_overbought());
        assert!(!rsi.is_oversold());
        assert_eq!(rsi.overbought_threshold(), 99.0);
    }

    proptest! {
        #[test]
        fn rsi_is_bounded(prices in prop::collection::vec(0.01f64..1_000_000.0, 0..60), period in 1usize..20) {
            let value = rsi_of(period, &prices).calculate();
            prop_assert!((0.0..=100.0).contains(&value));
        }

        #[test]
        fn decreasing_run_drives_rsi_low(start in 1_000.0f64..10_000.0, step in 0.5f64..10.0, period in 2usize..20) {
            let prices: Vec<f64> = (0..=period).map(|i| start - step * i as f64).collect();
            prop_assert!(rsi_of(period, &prices).calculate() < 1e-9);
        }

        #[test]
        fn increasing_run_drives_rsi_high(start in 1.0f64..10_000.0, step in 0.5f64..10.0, period in 2usize..20) {
            let prices: Vec<f64> = (0..=period).map(|i| start + step * i as f64).collect();
            prop_assert_eq!(rsi_of(period, &prices).calculate(), 100.0);
        }
    }
}
