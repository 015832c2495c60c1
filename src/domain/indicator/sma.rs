//! Simple moving average over a rolling price window, with golden/death
//! cross detection between a short and a long average.
//!
//! The window keeps `period + 1` prices: `period` for the current average and
//! one more so the previous tick's average can be compared against.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    window: VecDeque<f64>,
}

/// Direction of a short/long moving average crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    /// Short average moved from at-or-below to above the long average.
    Golden,
    /// Short average moved from at-or-above to below the long average.
    Death,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn push(&mut self, price: f64) {
        self.window.push_back(price);
        while self.window.len() > self.period + 1 {
            self.window.pop_front();
        }
    }

    /// Enough samples for the current average.
    pub fn is_ready(&self) -> bool {
        self.period > 0 && self.window.len() >= self.period
    }

    /// Enough samples for both the current and the previous average.
    pub fn has_previous(&self) -> bool {
        self.period > 0 && self.window.len() > self.period
    }

    /// Average of the most recent `period` prices; 0 until the window fills.
    pub fn value(&self) -> f64 {
        self.value_back(0)
    }

    /// Average of the `period` prices ending `back` ticks before the most
    /// recent one. Returns the 0 sentinel when the window is too short.
    pub fn value_back(&self, back: usize) -> f64 {
        let len = self.window.len();
        if self.period == 0 || len < self.period + back {
            return 0.0;
        }
        let end = len - back;
        let start = end - self.period;
        self.window.range(start..end).sum::<f64>() / self.period as f64
    }
}

/// Compare the current and previous averages of `short` and `long`.
///
/// Never reports a cross until both windows hold a previous value.
pub fn detect_cross(short: &MovingAverage, long: &MovingAverage) -> Option<Cross> {
    if !short.has_previous() || !long.has_previous() {
        return None;
    }

    let short_now = short.value();
    let long_now = long.value();
    let short_prev = short.value_back(1);
    let long_prev = long.value_back(1);

    if short_prev <= long_prev && short_now > long_now {
        Some(Cross::Golden)
    } else if short_prev >= long_prev && short_now < long_now {
        Some(Cross::Death)
    } else {
        None
    }
}
