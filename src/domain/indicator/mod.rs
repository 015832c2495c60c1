//! Stateful rolling-window indicators consumed by the strategies.
//!
//! Each calculator owns its own window and is fed one value per tick:
//! - `MovingAverage`: simple moving average with golden/death cross detection
//! - `Rsi`: relative-strength index over simple gain/loss averages
//! - `VolumeRatio`: current quote volume relative to its rolling mean
//!
//! `IndicatorKind` and `IndicatorReadings` describe a strategy's current
//! indicator values for event reporting.

pub mod rsi;
pub mod sma;
pub mod volume;

pub use rsi::Rsi;
pub use sma::{Cross, MovingAverage, detect_cross};
pub use volume::VolumeRatio;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Rsi(usize),
    VolumeRatio(usize),
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::VolumeRatio(period) => write!(f, "VOLUME_RATIO({})", period),
        }
    }
}

/// Snapshot of a strategy's indicator values after a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorReadings {
    pub values: Vec<(IndicatorKind, f64)>,
}

impl IndicatorReadings {
    pub fn push(&mut self, kind: IndicatorKind, value: f64) {
        self.values.push((kind, value));
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
    }

    /// Combine two snapshots, keeping the first value seen for each kind.
    pub fn merge(mut self, other: IndicatorReadings) -> Self {
        for (kind, value) in other.values {
            if self.get(kind).is_none() {
                self.values.push((kind, value));
            }
        }
        self
    }
}

impl fmt::Display for IndicatorReadings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (kind, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={:.2}", kind, value)?;
        }
        Ok(())
    }
}
