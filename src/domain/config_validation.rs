//! Configuration validation.
//!
//! Checks thresholds before any tick is processed. Missing keys are checked
//! against the same defaults the command line falls back to.

use crate::domain::error::SpotTraderError;
use crate::domain::lifecycle::ExitRules;
use crate::domain::sizing::{FeeSchedule, SizingConfig};
use crate::domain::strategy::{CrossoverParams, RsiVolumeParams};
use crate::ports::config_port::ConfigPort;

pub const STRATEGY_MODES: [&str; 3] = ["fused", "sma", "rsi-volume"];

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    validate_trade_percentage(config)?;
    validate_daily_trades(config)?;
    validate_poll_interval(config)?;
    validate_min_trade_amount(config)?;
    validate_assets(config)?;
    validate_strategy_mode(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    let defaults = ExitRules::default();
    require_positive(config, "risk", "stop_loss_percentage", defaults.stop_loss_percentage)?;
    require_positive(config, "risk", "take_profit_percentage", 5.0)?;
    require_positive(config, "risk", "min_profit_percentage", defaults.min_profit_percentage)?;
    require_positive(config, "risk", "max_position_age_hours", defaults.max_position_age_hours)?;

    let holding = config.get_int("risk", "min_holding_time_minutes", defaults.min_holding_time_minutes);
    if holding < 0 {
        return Err(invalid("risk", "min_holding_time_minutes", "min_holding_time_minutes must be non-negative"));
    }
    Ok(())
}

pub fn validate_fee_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    let defaults = FeeSchedule::default();
    validate_fee_rate(config, "maker_fee_rate", defaults.maker_fee_rate)?;
    validate_fee_rate(config, "taker_fee_rate", defaults.taker_fee_rate)?;

    let buffer = config.get_double(
        "fees",
        "fee_buffer_percentage",
        SizingConfig::default().fee_buffer_percentage,
    );
    if buffer < 0.0 {
        return Err(invalid("fees", "fee_buffer_percentage", "fee_buffer_percentage must be non-negative"));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    let crossover = CrossoverParams::default();
    let short = config.get_int("strategy", "short_period", crossover.short_period as i64);
    let long = config.get_int("strategy", "long_period", crossover.long_period as i64);
    if short < 1 {
        return Err(invalid("strategy", "short_period", "short_period must be at least 1"));
    }
    if long < 1 {
        return Err(invalid("strategy", "long_period", "long_period must be at least 1"));
    }
    if short >= long {
        return Err(invalid("strategy", "short_period", "short_period must be less than long_period"));
    }

    let rsi = RsiVolumeParams::default();
    if config.get_int("strategy", "rsi_period", rsi.rsi_period as i64) < 1 {
        return Err(invalid("strategy", "rsi_period", "rsi_period must be at least 1"));
    }

    let oversold = config.get_double("strategy", "rsi_oversold", rsi.oversold);
    let overbought = config.get_double("strategy", "rsi_overbought", rsi.overbought);
    if !(0.0..=100.0).contains(&oversold) {
        return Err(invalid("strategy", "rsi_oversold", "rsi_oversold must be between 0 and 100"));
    }
    if !(0.0..=100.0).contains(&overbought) {
        return Err(invalid("strategy", "rsi_overbought", "rsi_overbought must be between 0 and 100"));
    }
    if oversold >= overbought {
        return Err(invalid("strategy", "rsi_oversold", "rsi_oversold must be less than rsi_overbought"));
    }

    if config.get_int("strategy", "volume_period", rsi.volume_period as i64) < 1 {
        return Err(invalid("strategy", "volume_period", "volume_period must be at least 1"));
    }
    require_positive(config, "strategy", "volume_multiplier", rsi.volume_multiplier)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    require_positive(config, "backtest", "initial_balance", 10_000.0)?;
    if config.get_int("backtest", "limit", 1000) < 1 {
        return Err(invalid("backtest", "limit", "limit must be at least 1"));
    }
    match config.get_string("backtest", "source").as_deref() {
        None | Some("csv") | Some("binance") => Ok(()),
        Some(other) => Err(invalid(
            "backtest",
            "source",
            &format!("unknown source '{}', expected csv or binance", other),
        )),
    }
}

/// Everything the live loop needs.
pub fn validate_live_config(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    validate_trading_config(config)?;
    validate_risk_config(config)?;
    validate_fee_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> SpotTraderError {
    SpotTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), SpotTraderError> {
    let value = config.get_double(section, key, default);
    if value <= 0.0 {
        return Err(invalid(section, key, &format!("{} must be positive", key)));
    }
    Ok(())
}

fn validate_trade_percentage(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    let value = config.get_double("trading", "trade_percentage", SizingConfig::default().trade_percentage);
    if value <= 0.0 || value > 100.0 {
        return Err(invalid("trading", "trade_percentage", "trade_percentage must be between 0 and 100"));
    }
    Ok(())
}

fn validate_daily_trades(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    if config.get_int("trading", "max_daily_trades", 10) < 1 {
        return Err(invalid("trading", "max_daily_trades", "max_daily_trades must be at least 1"));
    }
    Ok(())
}

fn validate_poll_interval(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    if config.get_int("trading", "poll_interval_seconds", 30) < 1 {
        return Err(invalid("trading", "poll_interval_seconds", "poll_interval_seconds must be at least 1"));
    }
    Ok(())
}

fn validate_min_trade_amount(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    let value = config.get_double("trading", "min_trade_amount", SizingConfig::default().min_trade_amount);
    if value < 0.0 {
        return Err(invalid("trading", "min_trade_amount", "min_trade_amount must be non-negative"));
    }
    Ok(())
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    for key in ["base_asset", "quote_asset"] {
        if let Some(value) = config.get_string("trading", key) {
            if value.trim().is_empty() {
                return Err(SpotTraderError::ConfigMissing {
                    section: "trading".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_strategy_mode(config: &dyn ConfigPort) -> Result<(), SpotTraderError> {
    match config.get_string("trading", "strategy") {
        Some(mode) if !STRATEGY_MODES.contains(&mode.trim()) => Err(invalid(
            "trading",
            "strategy",
            &format!("unknown strategy '{}', expected one of {}", mode, STRATEGY_MODES.join(", ")),
        )),
        _ => Ok(()),
    }
}

fn validate_fee_rate(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), SpotTraderError> {
    let value = config.get_double("fees", key, default);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("fees", key, &format!("{} must be in [0, 1)", key)));
    }
    Ok(())
}
