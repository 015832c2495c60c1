//! Moving average crossover: buy on a golden cross, sell on a death cross
//! or when the exit guard fires.

use super::{ExitGuard, FeeAwareSizing, Strategy};
use crate::domain::indicator::{Cross, IndicatorKind, IndicatorReadings, MovingAverage, detect_cross};
use crate::domain::sizing::SizingConfig;
use crate::domain::tick::MarketTick;
use crate::domain::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossoverParams {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            short_period: 12,
            long_period: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    short: MovingAverage,
    long: MovingAverage,
    last_cross: Option<Cross>,
    guard: ExitGuard,
    sizing: SizingConfig,
}

impl CrossoverStrategy {
    pub fn new(params: CrossoverParams, guard: ExitGuard, sizing: SizingConfig) -> Self {
        Self {
            short: MovingAverage::new(params.short_period),
            long: MovingAverage::new(params.long_period),
            last_cross: None,
            guard,
            sizing,
        }
    }

    pub fn short_sma(&self) -> f64 {
        self.short.value()
    }

    pub fn long_sma(&self) -> f64 {
        self.long.value()
    }

    pub fn last_cross(&self) -> Option<Cross> {
        self.last_cross
    }
}

impl FeeAwareSizing for CrossoverStrategy {
    fn sizing_config(&self) -> &SizingConfig {
        &self.sizing
    }
}

impl Strategy for CrossoverStrategy {
    fn name(&self) -> &str {
        "sma-crossover"
    }

    fn required_history(&self) -> usize {
        self.long.period().max(self.short.period()) + 5
    }

    fn on_tick(&mut self, tick: &MarketTick) {
        self.short.push(tick.price);
        self.long.push(tick.price);
        self.last_cross = detect_cross(&self.short, &self.long);
    }

    fn should_buy(&self, _tick: &MarketTick) -> bool {
        self.last_cross == Some(Cross::Golden)
    }

    fn should_sell(&self, tick: &MarketTick) -> bool {
        self.last_cross == Some(Cross::Death) || self.guard.triggered(tick.price)
    }

    fn on_fill(&mut self, trade: &Trade) {
        self.guard.on_fill(trade);
    }

    fn readings(&self) -> IndicatorReadings {
        let mut readings = IndicatorReadings::default();
        readings.push(IndicatorKind::Sma(self.short.period()), self.short.value());
        readings.push(IndicatorKind::Sma(self.long.period()), self.long.value());
        readings
    }
}
