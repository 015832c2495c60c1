//! Events emitted by the live orchestrator.
//!
//! The decision path never writes to the console or the log; it sends these
//! over a `flume` channel and whoever holds the receiver renders them.

use chrono::{DateTime, Utc};

use super::fusion::{ExitReason, SignalDecision};
use super::indicator::IndicatorReadings;
use super::lifecycle::Reconciliation;
use super::position::Position;
use super::sizing::{FeeSchedule, SymbolRules};
use super::trade::{Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    ZeroQuantity,
    AlreadyInPosition,
    NoPosition,
    InsufficientBalance { required: f64, available: f64 },
    Validation(String),
    Rejected(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ZeroQuantity => write!(f, "sized quantity is zero"),
            SkipReason::AlreadyInPosition => write!(f, "position already open"),
            SkipReason::NoPosition => write!(f, "no position to sell"),
            SkipReason::InsufficientBalance { required, available } => {
                write!(f, "insufficient balance: required {:.8}, available {:.8}", required, available)
            }
            SkipReason::Validation(reason) => write!(f, "order validation failed: {}", reason),
            SkipReason::Rejected(reason) => write!(f, "exchange rejected order: {}", reason),
        }
    }
}

/// Counters reported when the live loop stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub total_trades: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub total_pnl: f64,
    pub strong_signals: usize,
    pub moderate_signals: usize,
    pub conservative_signals: usize,
}

impl SessionStats {
    /// Winning sells over all sells, as a percentage.
    pub fn win_rate(&self) -> f64 {
        if self.closed_trades == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / self.closed_trades as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraderEvent {
    Started {
        symbol: String,
        strategy: String,
        fees: FeeSchedule,
        rules: Option<SymbolRules>,
    },
    WarmedUp {
        candles: usize,
    },
    WarmUpFailed {
        reason: String,
    },
    PositionRestored(Position),
    Reconciled(Reconciliation),
    TickObserved {
        symbol: String,
        price: f64,
        timestamp: DateTime<Utc>,
        readings: IndicatorReadings,
    },
    SignalEvaluated(SignalDecision),
    HeldByMinHolding {
        holding_minutes: i64,
    },
    ForcedExit(ExitReason),
    OrderSkipped {
        side: Side,
        reason: SkipReason,
    },
    OrderExecuted(Trade),
    PositionOpened(Position),
    PositionIncreased(Position),
    PositionClosed {
        position: Position,
        pnl: f64,
    },
    DailyLimitReached {
        trades: u32,
        limit: u32,
    },
    NewTradingDay {
        previous_trades: u32,
    },
    TickAborted {
        reason: String,
    },
    StoreFailed {
        reason: String,
    },
    Stopped(SessionStats),
}
