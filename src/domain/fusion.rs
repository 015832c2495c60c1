//! Signal fusion policy.
//!
//! Combines the crossover and oscillator strategies into one tiered decision.
//!
//! Buy tiers, first match wins:
//! 1. Strong: both strategies buy
//! 2. Conservative: oscillator buys and RSI is oversold
//! 3. Moderate: crossover buys and RSI is not overbought
//!
//! Without a position only Strong and Conservative are executed; with a
//! position only Strong adds to it.
//!
//! With a position, sells are checked in order: profit target, max age, stop
//! loss, then the minimum-holding veto, then combined signals (Strong,
//! Moderate when RSI is not oversold, Conservative when RSI is overbought).
//! The veto only blocks the combined-signal path.

use std::fmt;

use super::lifecycle::ExitChecks;

/// Per-tick booleans of both strategies plus the oscillator's RSI state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategySignals {
    pub crossover_buy: bool,
    pub crossover_sell: bool,
    pub oscillator_buy: bool,
    pub oscillator_sell: bool,
    pub rsi_oversold: bool,
    pub rsi_overbought: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalStrength {
    None,
    Moderate,
    Conservative,
    Strong,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStrength::None => "none",
            SignalStrength::Moderate => "moderate",
            SignalStrength::Conservative => "conservative",
            SignalStrength::Strong => "strong",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ProfitTarget,
    MaxAge,
    StopLoss,
    Signal(SignalStrength),
}

impl ExitReason {
    pub fn is_forced(&self) -> bool {
        !matches!(self, ExitReason::Signal(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::ProfitTarget => write!(f, "profit target"),
            ExitReason::MaxAge => write!(f, "max position age"),
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::Signal(strength) => write!(f, "{} sell signal", strength),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDecision {
    pub action: Action,
    /// Strength of the tier behind `action`, or of the recorded buy tier when
    /// the action is `Keep`.
    pub strength: SignalStrength,
    pub flags: StrategySignals,
    pub exit_reason: Option<ExitReason>,
    /// A sell was vetoed by the minimum holding time.
    pub held_by_min_holding: bool,
}

impl SignalDecision {
    fn keep(strength: SignalStrength, flags: StrategySignals) -> Self {
        Self {
            action: Action::Keep,
            strength,
            flags,
            exit_reason: None,
            held_by_min_holding: false,
        }
    }
}

pub fn buy_strength(flags: &StrategySignals) -> SignalStrength {
    if flags.crossover_buy && flags.oscillator_buy {
        SignalStrength::Strong
    } else if flags.oscillator_buy && flags.rsi_oversold {
        SignalStrength::Conservative
    } else if flags.crossover_buy && !flags.rsi_overbought {
        SignalStrength::Moderate
    } else {
        SignalStrength::None
    }
}

pub fn sell_strength(flags: &StrategySignals) -> SignalStrength {
    if flags.crossover_sell && flags.oscillator_sell {
        SignalStrength::Strong
    } else if flags.crossover_sell && !flags.rsi_oversold {
        SignalStrength::Moderate
    } else if flags.oscillator_sell && flags.rsi_overbought {
        SignalStrength::Conservative
    } else {
        SignalStrength::None
    }
}

/// Forced exit that fires regardless of signals, in priority order.
pub fn forced_exit(checks: &ExitChecks) -> Option<ExitReason> {
    if checks.profit_target {
        Some(ExitReason::ProfitTarget)
    } else if checks.max_age {
        Some(ExitReason::MaxAge)
    } else if checks.stop_loss {
        Some(ExitReason::StopLoss)
    } else {
        None
    }
}

/// Decide the action for one tick. `exit_checks` is `Some` exactly when a
/// position is open.
pub fn decide(flags: StrategySignals, exit_checks: Option<ExitChecks>, allow_pyramiding: bool) -> SignalDecision {
    let buy = buy_strength(&flags);

    let Some(checks) = exit_checks else {
        return if matches!(buy, SignalStrength::Strong | SignalStrength::Conservative) {
            SignalDecision {
                action: Action::Buy,
                ..SignalDecision::keep(buy, flags)
            }
        } else {
            SignalDecision::keep(buy, flags)
        };
    };

    if let Some(reason) = forced_exit(&checks) {
        return SignalDecision {
            action: Action::Sell,
            strength: SignalStrength::None,
            flags,
            exit_reason: Some(reason),
            held_by_min_holding: false,
        };
    }

    let sell = sell_strength(&flags);
    let vetoed = checks.below_min_holding;

    if sell != SignalStrength::None && !vetoed {
        return SignalDecision {
            action: Action::Sell,
            strength: sell,
            flags,
            exit_reason: Some(ExitReason::Signal(sell)),
            held_by_min_holding: false,
        };
    }

    let mut decision = if allow_pyramiding && buy == SignalStrength::Strong {
        SignalDecision {
            action: Action::Buy,
            ..SignalDecision::keep(buy, flags)
        }
    } else {
        SignalDecision::keep(buy, flags)
    };
    decision.held_by_min_holding = vetoed && sell != SignalStrength::None;
    decision
}
