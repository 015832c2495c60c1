//! Core domain types and logic.

pub mod tick;
pub mod indicator;
pub mod strategy;
pub mod fusion;
pub mod signal_source;
pub mod position;
pub mod lifecycle;
pub mod trade;
pub mod sizing;
pub mod backtest;
pub mod metrics;
pub mod event;
pub mod trader;
pub mod config_validation;
pub mod error;
