//! Where trading decisions come from: one strategy, or the crossover and
//! oscillator strategies fused.

use super::fusion::{self, SignalDecision, StrategySignals};
use super::indicator::IndicatorReadings;
use super::lifecycle::ExitChecks;
use super::sizing::{FeeSchedule, SymbolRules};
use super::strategy::{CrossoverStrategy, FeeAwareSizing, RsiVolumeStrategy, Strategy};
use super::tick::{Kline, MarketTick};
use super::trade::Trade;

pub enum SignalSource {
    Single(Box<dyn Strategy>),
    Fused {
        crossover: CrossoverStrategy,
        oscillator: RsiVolumeStrategy,
    },
}

impl SignalSource {
    pub fn single(strategy: Box<dyn Strategy>) -> Self {
        SignalSource::Single(strategy)
    }

    pub fn fused(crossover: CrossoverStrategy, oscillator: RsiVolumeStrategy) -> Self {
        SignalSource::Fused { crossover, oscillator }
    }

    pub fn name(&self) -> String {
        match self {
            SignalSource::Single(s) => s.name().to_string(),
            SignalSource::Fused { crossover, oscillator } => {
                format!("{}+{}", crossover.name(), oscillator.name())
            }
        }
    }

    pub fn required_history(&self) -> usize {
        match self {
            SignalSource::Single(s) => s.required_history(),
            SignalSource::Fused { crossover, oscillator } => {
                crossover.required_history().max(oscillator.required_history())
            }
        }
    }

    pub fn warm_up(&mut self, klines: &[Kline]) {
        match self {
            SignalSource::Single(s) => s.warm_up(klines),
            SignalSource::Fused { crossover, oscillator } => {
                crossover.warm_up(klines);
                oscillator.warm_up(klines);
            }
        }
    }

    pub fn configure_exchange(&mut self, fees: FeeSchedule, rules: Option<SymbolRules>) {
        match self {
            SignalSource::Single(s) => s.configure_exchange(fees, rules),
            SignalSource::Fused { crossover, oscillator } => {
                crossover.configure_exchange(fees, rules);
                oscillator.configure_exchange(fees, rules);
            }
        }
    }

    pub fn on_tick(&mut self, tick: &MarketTick) {
        match self {
            SignalSource::Single(s) => s.on_tick(tick),
            SignalSource::Fused { crossover, oscillator } => {
                crossover.on_tick(tick);
                oscillator.on_tick(tick);
            }
        }
    }

    /// Flags for the fusion policy. A single strategy stands in for both
    /// sides, so its own signal is always the strong tier.
    pub fn signals(&self, tick: &MarketTick) -> StrategySignals {
        match self {
            SignalSource::Single(s) => {
                let buy = s.should_buy(tick);
                let sell = s.should_sell(tick);
                StrategySignals {
                    crossover_buy: buy,
                    crossover_sell: sell,
                    oscillator_buy: buy,
                    oscillator_sell: sell,
                    rsi_oversold: false,
                    rsi_overbought: false,
                }
            }
            SignalSource::Fused { crossover, oscillator } => StrategySignals {
                crossover_buy: crossover.should_buy(tick),
                crossover_sell: crossover.should_sell(tick),
                oscillator_buy: oscillator.should_buy(tick),
                oscillator_sell: oscillator.should_sell(tick),
                rsi_oversold: oscillator.is_oversold(),
                rsi_overbought: oscillator.is_overbought(),
            },
        }
    }

    /// Decision for the tick. A single strategy never pyramids.
    pub fn evaluate(&self, tick: &MarketTick, exit_checks: Option<ExitChecks>, allow_pyramiding: bool) -> SignalDecision {
        let flags = self.signals(tick);
        let pyramiding = match self {
            SignalSource::Single(_) => false,
            SignalSource::Fused { .. } => allow_pyramiding,
        };
        fusion::decide(flags, exit_checks, pyramiding)
    }

    /// Strategy whose sizing capability prices orders.
    pub fn sizer(&self) -> &dyn Strategy {
        match self {
            SignalSource::Single(s) => s.as_ref(),
            SignalSource::Fused { oscillator, .. } => oscillator,
        }
    }

    pub fn on_fill(&mut self, trade: &Trade) {
        match self {
            SignalSource::Single(s) => s.on_fill(trade),
            SignalSource::Fused { crossover, oscillator } => {
                crossover.on_fill(trade);
                oscillator.on_fill(trade);
            }
        }
    }

    pub fn readings(&self) -> IndicatorReadings {
        match self {
            SignalSource::Single(s) => s.readings(),
            SignalSource::Fused { crossover, oscillator } => crossover.readings().merge(oscillator.readings()),
        }
    }
}
