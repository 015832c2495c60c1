//! Domain error types.

/// Exchange lot-size / notional constraint that an order quantity violates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderViolation {
    #[error("quantity {quantity} below minimum {min_qty}")]
    BelowMinQty { quantity: f64, min_qty: f64 },

    #[error("quantity {quantity} above maximum {max_qty}")]
    AboveMaxQty { quantity: f64, max_qty: f64 },

    #[error("quantity {quantity} not aligned with step size {step_size} (nearest {nearest})")]
    StepMisaligned {
        quantity: f64,
        step_size: f64,
        nearest: f64,
    },

    #[error("order value {notional} below minimum notional {min_notional}")]
    BelowMinNotional { notional: f64, min_notional: f64 },
}

/// Top-level error type for spottrader.
#[derive(Debug, thiserror::Error)]
pub enum SpotTraderError {
    #[error("market data error for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    #[error("order validation failed: {0}")]
    OrderValidation(#[from] OrderViolation),

    #[error("insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: f64,
        available: f64,
    },

    #[error("exchange rejected {side} order for {symbol}: {reason}")]
    ExchangeRejection {
        symbol: String,
        side: String,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("position store error: {reason}")]
    Store { reason: String },

    #[error("no historical ticks for {symbol}")]
    EmptySeries { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SpotTraderError> for std::process::ExitCode {
    fn from(err: &SpotTraderError) -> Self {
        let code: u8 = match err {
            SpotTraderError::Io(_) => 1,
            SpotTraderError::ConfigParse { .. }
            | SpotTraderError::ConfigMissing { .. }
            | SpotTraderError::ConfigInvalid { .. } => 2,
            SpotTraderError::Store { .. } => 3,
            SpotTraderError::MarketData { .. }
            | SpotTraderError::ExchangeRejection { .. }
            | SpotTraderError::OrderValidation(_)
            | SpotTraderError::InsufficientBalance { .. } => 4,
            SpotTraderError::EmptySeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
