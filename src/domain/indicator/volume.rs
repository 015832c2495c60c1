//! Quote-volume ratio against a rolling mean.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
    window: VecDeque<f64>,
}

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn push(&mut self, quote_volume: f64) {
        self.window.push_back(quote_volume);
        while self.window.len() > self.period {
            self.window.pop_front();
        }
    }

    /// Mean of the window, 0 until `period` samples are held.
    pub fn average(&self) -> f64 {
        if self.period == 0 || self.window.len() < self.period {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.period as f64
    }

    /// `current / average`, or 1.0 while the average is unknown.
    pub fn ratio(&self, current: f64) -> f64 {
        let avg = self.average();
        if avg == 0.0 { 1.0 } else { current / avg }
    }

    /// Ratio of the most recently pushed volume.
    pub fn latest_ratio(&self) -> f64 {
        self.window.back().map_or(1.0, |&v| self.ratio(v))
    }

    /// An unknown average never blocks a signal.
    pub fn is_above_average(&self, current: f64, multiplier: f64) -> bool {
        let avg = self.average();
        avg == 0.0 || current > avg * multiplier
    }
}
