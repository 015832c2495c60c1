//! Order sizing and exchange quantization.
//!
//! Converts a wallet percentage into an order quantity, optionally grossing
//! it up for the taker fee plus a safety buffer, then rounds it to the
//! symbol's lot-size rules:
//!
//! - sells round down to the step (probing one step up when the balance still
//!   covers it) and never exceed the available balance
//! - buys round to the nearest step
//! - both clamp up to `min_qty`, and magnitudes under 1e-10 become 0
//!
//! Nothing here fails hard: rejections are returned as `SizingRejection` and
//! callers treat them as a zero quantity.

use super::error::OrderViolation;
use super::tick::{MarketTick, WalletBalances};

/// Below this magnitude a quantity is exactly zero.
const ZERO_EPSILON: f64 = 1e-10;
/// Step alignment tolerance used by validation.
const ALIGN_TOLERANCE: f64 = 1e-8;
/// Tolerance for comparing currency amounts against the minimum trade.
const AMOUNT_EPSILON: f64 = 1e-9;

/// Lot-size and notional filters of one symbol. `step_size` is always > 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolRules {
    pub step_size: f64,
    pub min_qty: f64,
    pub max_qty: f64,
    pub min_notional: f64,
}

impl SymbolRules {
    /// Number of decimals in `step_size` as written, e.g. 0.00001 -> 5.
    pub fn precision(&self) -> u32 {
        step_decimals(self.step_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub maker_fee_rate: f64,
    pub taker_fee_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_fee_rate: 0.001,
            taker_fee_rate: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingConfig {
    pub trade_percentage: f64,
    pub include_fees: bool,
    pub fee_buffer_percentage: f64,
    pub min_trade_amount: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            trade_percentage: 5.0,
            include_fees: true,
            fee_buffer_percentage: 0.2,
            min_trade_amount: 50.0,
        }
    }
}

/// Intermediate amounts of the fee-adjusted path, all in quote currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeBreakdown {
    pub desired_net: f64,
    pub gross_notional: f64,
    pub buffer: f64,
    pub total_required: f64,
    pub trade_amount: f64,
    /// The quote balance could not cover `total_required`.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSize {
    pub quantity: f64,
    pub raw_quantity: f64,
    pub trade_amount: f64,
    pub total_wallet_value: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingRejection {
    #[error("trade amount {amount:.2} below minimum {minimum:.2}")]
    BelowMinimumTrade { amount: f64, minimum: f64 },

    #[error("insufficient quote balance: required {required:.2}, available {available:.2}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("invalid price {0}")]
    InvalidPrice(f64),

    #[error(transparent)]
    Violation(#[from] OrderViolation),
}

fn step_decimals(step: f64) -> u32 {
    let text = format!("{}", step);
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len().min(16) as u32,
        None => 0,
    }
}

fn snap(value: f64, step: f64) -> f64 {
    let factor = 10f64.powi(step_decimals(step) as i32);
    let snapped = (value * factor).round() / factor;
    if snapped.abs() < ZERO_EPSILON { 0.0 } else { snapped }
}

/// Round a sell quantity against the available balance.
pub fn round_for_sell(quantity: f64, rules: &SymbolRules, available: f64) -> f64 {
    let step = rules.step_size;
    let available = available.max(0.0);
    let target = quantity.max(0.0).min(available);

    let steps = (target / step + ZERO_EPSILON).floor();
    let mut rounded = snap(steps * step, step);
    if rounded > available {
        rounded = snap((steps - 1.0).max(0.0) * step, step);
    }

    if target - rounded > ZERO_EPSILON {
        let up = snap(rounded + step, step);
        if up <= available {
            rounded = up;
        }
    }

    if rounded < rules.min_qty {
        rounded = if rules.min_qty <= available {
            rules.min_qty
        } else {
            0.0
        };
    }

    if rounded.abs() < ZERO_EPSILON { 0.0 } else { rounded }
}

/// Round a buy quantity to the nearest step, clamped up to `min_qty`.
pub fn round_for_buy(quantity: f64, rules: &SymbolRules) -> f64 {
    if quantity.is_nan() || quantity <= 0.0 {
        return 0.0;
    }
    let step = rules.step_size;
    let mut rounded = snap((quantity / step).round() * step, step);
    if rounded < rules.min_qty {
        rounded = snap(rules.min_qty, step);
    }
    if rounded.abs() < ZERO_EPSILON { 0.0 } else { rounded }
}

/// Sell rounding when the balance is known, nearest-step rounding otherwise.
pub fn round_quantity(quantity: f64, rules: &SymbolRules, available: Option<f64>) -> f64 {
    match available {
        Some(balance) => round_for_sell(quantity, rules, balance),
        None => round_for_buy(quantity, rules),
    }
}

/// First violated lot-size or notional constraint, if any.
pub fn validate_order(quantity: f64, price: f64, rules: &SymbolRules) -> Result<(), OrderViolation> {
    if quantity < rules.min_qty {
        return Err(OrderViolation::BelowMinQty {
            quantity,
            min_qty: rules.min_qty,
        });
    }
    if rules.max_qty > 0.0 && quantity > rules.max_qty {
        return Err(OrderViolation::AboveMaxQty {
            quantity,
            max_qty: rules.max_qty,
        });
    }

    let nearest = snap((quantity / rules.step_size).round() * rules.step_size, rules.step_size);
    if (quantity - nearest).abs() > ALIGN_TOLERANCE {
        return Err(OrderViolation::StepMisaligned {
            quantity,
            step_size: rules.step_size,
            nearest,
        });
    }

    let notional = quantity * price;
    if notional < rules.min_notional {
        return Err(OrderViolation::BelowMinNotional {
            notional,
            min_notional: rules.min_notional,
        });
    }
    Ok(())
}

/// Fee-adjusted trade amount for a wallet worth `total_wallet_value`.
pub fn fee_adjusted_amount(
    total_wallet_value: f64,
    quote_balance: f64,
    config: &SizingConfig,
    taker_fee_rate: f64,
) -> Result<FeeBreakdown, SizingRejection> {
    let desired_net = total_wallet_value * config.trade_percentage / 100.0;

    if !config.include_fees {
        return Ok(FeeBreakdown {
            desired_net,
            gross_notional: desired_net,
            buffer: 0.0,
            total_required: desired_net,
            trade_amount: desired_net,
            used_fallback: false,
        });
    }

    let gross_notional = desired_net / (1.0 - taker_fee_rate);
    let buffer = gross_notional * config.fee_buffer_percentage / 100.0;
    let total_required = gross_notional + buffer;

    if total_required > quote_balance {
        let fallback = quote_balance * (1.0 - taker_fee_rate - config.fee_buffer_percentage / 100.0);
        if fallback + AMOUNT_EPSILON < config.min_trade_amount {
            return Err(SizingRejection::BelowMinimumTrade {
                amount: fallback,
                minimum: config.min_trade_amount,
            });
        }
        return Ok(FeeBreakdown {
            desired_net,
            gross_notional,
            buffer,
            total_required,
            trade_amount: fallback,
            used_fallback: true,
        });
    }

    Ok(FeeBreakdown {
        desired_net,
        gross_notional,
        buffer,
        total_required,
        trade_amount: gross_notional * (1.0 - taker_fee_rate),
        used_fallback: false,
    })
}

/// Percentage of the total wallet without fee adjustment, rounded to six
/// decimals.
pub fn plain_position_size(
    tick: &MarketTick,
    wallet: &WalletBalances,
    config: &SizingConfig,
) -> Result<OrderSize, SizingRejection> {
    if tick.price.is_nan() || tick.price <= 0.0 {
        return Err(SizingRejection::InvalidPrice(tick.price));
    }

    let total_wallet_value = wallet.total_value(tick.price);
    let trade_amount = total_wallet_value * config.trade_percentage / 100.0;
    let raw_quantity = trade_amount / tick.price;
    let quantity = (raw_quantity * 1e6).round() / 1e6;

    if trade_amount + AMOUNT_EPSILON < config.min_trade_amount {
        return Err(SizingRejection::BelowMinimumTrade {
            amount: trade_amount,
            minimum: config.min_trade_amount,
        });
    }
    if trade_amount > wallet.quote {
        return Err(SizingRejection::InsufficientBalance {
            required: trade_amount,
            available: wallet.quote,
        });
    }

    Ok(OrderSize {
        quantity,
        raw_quantity,
        trade_amount,
        total_wallet_value,
    })
}

/// Fee-aware sizing bound to one symbol's fee schedule and lot-size rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeEngine {
    pub fees: FeeSchedule,
    pub config: SizingConfig,
    pub rules: Option<SymbolRules>,
}

impl FeeEngine {
    pub fn new(fees: FeeSchedule, config: SizingConfig, rules: Option<SymbolRules>) -> Self {
        Self { fees, config, rules }
    }

    pub fn position_size(&self, tick: &MarketTick, wallet: &WalletBalances) -> Result<OrderSize, SizingRejection> {
        if tick.price.is_nan() || tick.price <= 0.0 {
            return Err(SizingRejection::InvalidPrice(tick.price));
        }

        let total_wallet_value = wallet.total_value(tick.price);
        let breakdown = fee_adjusted_amount(
            total_wallet_value,
            wallet.quote,
            &self.config,
            self.fees.taker_fee_rate,
        )?;

        let raw_quantity = breakdown.trade_amount / tick.price;
        let quantity = match &self.rules {
            Some(rules) => round_for_buy(raw_quantity, rules),
            None => raw_quantity,
        };

        if breakdown.trade_amount + AMOUNT_EPSILON < self.config.min_trade_amount {
            return Err(SizingRejection::BelowMinimumTrade {
                amount: breakdown.trade_amount,
                minimum: self.config.min_trade_amount,
            });
        }

        if let Some(rules) = &self.rules {
            validate_order(quantity, tick.price, rules)?;
        }

        Ok(OrderSize {
            quantity,
            raw_quantity,
            trade_amount: breakdown.trade_amount,
            total_wallet_value,
        })
    }

    pub fn sell_quantity(&self, requested: f64, available: f64) -> f64 {
        match &self.rules {
            Some(rules) => round_for_sell(requested, rules, available),
            None => requested.min(available),
        }
    }

    pub fn check_order(&self, quantity: f64, price: f64) -> Result<(), OrderViolation> {
        match &self.rules {
            Some(rules) => validate_order(quantity, price, rules),
            None => Ok(()),
        }
    }
}
