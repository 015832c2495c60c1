//! RSI with a volume filter.
//!
//! Buys while RSI is below the overbought line on above-average quote volume,
//! sells while RSI is above the oversold line on above-average volume or when
//! the exit guard fires. Sizes orders through the fee engine.

use super::{ExitGuard, FeeAwareSizing, Strategy};
use crate::domain::error::OrderViolation;
use crate::domain::indicator::{IndicatorKind, IndicatorReadings, Rsi, VolumeRatio};
use crate::domain::sizing::{FeeEngine, FeeSchedule, OrderSize, SizingConfig, SizingRejection, SymbolRules};
use crate::domain::tick::{MarketTick, WalletBalances};
use crate::domain::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiVolumeParams {
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub volume_period: usize,
    pub volume_multiplier: f64,
}

impl Default for RsiVolumeParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            volume_period: 20,
            volume_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RsiVolumeStrategy {
    rsi: Rsi,
    volume: VolumeRatio,
    volume_multiplier: f64,
    guard: ExitGuard,
    engine: FeeEngine,
}

impl RsiVolumeStrategy {
    pub fn new(params: RsiVolumeParams, guard: ExitGuard, engine: FeeEngine) -> Self {
        Self {
            rsi: Rsi::with_thresholds(params.rsi_period, params.oversold, params.overbought),
            volume: VolumeRatio::new(params.volume_period),
            volume_multiplier: params.volume_multiplier,
            guard,
            engine,
        }
    }

    pub fn rsi_value(&self) -> f64 {
        self.rsi.calculate()
    }

    pub fn is_oversold(&self) -> bool {
        self.rsi.is_oversold()
    }

    pub fn is_overbought(&self) -> bool {
        self.rsi.is_overbought()
    }

    pub fn volume_ratio(&self, quote_volume: f64) -> f64 {
        self.volume.ratio(quote_volume)
    }

    pub fn engine(&self) -> &FeeEngine {
        &self.engine
    }

    fn volume_confirms(&self, tick: &MarketTick) -> bool {
        self.volume
            .is_above_average(tick.quote_volume, self.volume_multiplier)
    }
}

impl FeeAwareSizing for RsiVolumeStrategy {
    fn sizing_config(&self) -> &SizingConfig {
        &self.engine.config
    }

    fn position_size(&self, tick: &MarketTick, wallet: &WalletBalances) -> Result<OrderSize, SizingRejection> {
        self.engine.position_size(tick, wallet)
    }

    fn sell_quantity(&self, requested: f64, available: f64) -> f64 {
        self.engine.sell_quantity(requested, available)
    }

    fn check_order(&self, quantity: f64, price: f64) -> Result<(), OrderViolation> {
        self.engine.check_order(quantity, price)
    }

    fn configure_exchange(&mut self, fees: FeeSchedule, rules: Option<SymbolRules>) {
        self.engine.fees = fees;
        if rules.is_some() {
            self.engine.rules = rules;
        }
    }
}

impl Strategy for RsiVolumeStrategy {
    fn name(&self) -> &str {
        "rsi-volume"
    }

    fn required_history(&self) -> usize {
        self.rsi.period().max(self.volume.period()) + 5
    }

    fn on_tick(&mut self, tick: &MarketTick) {
        self.rsi.push(tick.price);
        self.volume.push(tick.quote_volume);
    }

    fn should_buy(&self, tick: &MarketTick) -> bool {
        self.rsi.calculate() < self.rsi.overbought_threshold() && self.volume_confirms(tick)
    }

    fn should_sell(&self, tick: &MarketTick) -> bool {
        let signal = self.rsi.calculate() > self.rsi.oversold_threshold() && self.volume_confirms(tick);
        signal || self.guard.triggered(tick.price)
    }

    fn on_fill(&mut self, trade: &Trade) {
        self.guard.on_fill(trade);
    }

    fn readings(&self) -> IndicatorReadings {
        let mut readings = IndicatorReadings::default();
        readings.push(IndicatorKind::Rsi(self.rsi.period()), self.rsi.calculate());
        readings.push(IndicatorKind::VolumeRatio(self.volume.period()), self.volume.latest_ratio());
        readings
    }
}
