//! Pre-trade limits for automated buys

use thiserror::Error;

/// XRP kept aside for fees and reserve on top of the trade amount
pub const FEE_RESERVE_XRP: f64 = 0.5;

/// Limits applied before an automated buy is submitted
#[derive(Debug, Clone)]
pub struct RiskLimits {
    /// Maximum XRP per automated buy
    pub max_trade_xrp: f64,
    /// XRP that must remain after the trade
    pub fee_reserve_xrp: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_trade_xrp: 5000.0,
            fee_reserve_xrp: FEE_RESERVE_XRP,
        }
    }
}

impl RiskLimits {
    pub fn with_max_trade(max_trade_xrp: f64) -> Self {
        Self {
            max_trade_xrp,
            ..Self::default()
        }
    }
}

/// Check an automated buy of `amount_xrp` against `limits` and the wallet's native balance
pub fn check_trade_allowed(
    limits: &RiskLimits,
    current_balance: f64,
    amount_xrp: f64,
) -> Result<(), RiskViolation> {
    if !(amount_xrp.is_finite() && amount_xrp > 0.0) {
        return Err(RiskViolation::InvalidAmount(amount_xrp));
    }

    if amount_xrp > limits.max_trade_xrp {
        return Err(RiskViolation::ExceedsMaxTradeSize {
            requested: amount_xrp,
            maximum: limits.max_trade_xrp,
        });
    }

    let required = amount_xrp + limits.fee_reserve_xrp;
    if current_balance < required {
        return Err(RiskViolation::InsufficientBalance {
            current: current_balance,
            required,
        });
    }

    Ok(())
}

/// Risk limit violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskViolation {
    #[error("Invalid trade amount: {0} XRP")]
    InvalidAmount(f64),

    #[error("Trade of {requested} XRP exceeds the {maximum} XRP limit")]
    ExceedsMaxTradeSize { requested: f64, maximum: f64 },

    #[error("Insufficient XRP balance: have {current}, need {required}")]
    InsufficientBalance { current: f64, required: f64 },
}
