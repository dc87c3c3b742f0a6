//! Trade-related models

use super::TokenIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade direction, from the point of view of the account holding XRP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Paid XRP, received tokens
    Buy,
    /// Paid tokens, received XRP
    Sell,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }
}

/// Where the liquidity for a trade came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMechanism {
    /// An automated market maker pool
    Amm,
    /// Consumed order-book offers
    Orderbook,
}

/// A buy or sell inferred from one settled transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub direction: TradeDirection,
    pub token: TokenIdentity,
    pub readable_symbol: String,
    /// XRP moved by the trade
    pub xrp_amount: f64,
    /// Tokens moved by the trade
    pub token_amount: f64,
    pub mechanism: TradeMechanism,
}

impl TradeEvent {
    /// Tokens per XRP realised by the observed trade
    pub fn tokens_per_xrp(&self) -> Option<f64> {
        (self.xrp_amount > 0.0).then(|| self.token_amount / self.xrp_amount)
    }
}

/// Why a swap did not go through
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwapFailure {
    #[error("Failed to create trust line: {0}")]
    TrustLine(String),

    #[error("AMM pool not found for this token pair")]
    PoolNotFound,

    #[error("No trust line found for {0}; cannot sell tokens you don't hold")]
    NoTrustLine(String),

    #[error("Insufficient balance: have {available}, trying to spend {requested}")]
    InsufficientBalance { available: f64, requested: f64 },

    #[error("Invalid trade amount: {0}")]
    InvalidAmount(f64),

    #[error("Transaction failed: {0}")]
    Settlement(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result of one swap attempt, reconciled against the pre-trade quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutcome {
    pub success: bool,
    pub direction: TradeDirection,
    pub transaction_hash: Option<String>,
    /// XRP (buy) or tokens (sell) given up
    pub amount_sent: Option<f64>,
    /// Tokens (buy) or XRP (sell) obtained
    pub amount_received: Option<f64>,
    /// Units received per unit sent, as realised
    pub effective_rate: Option<f64>,
    /// Units received per unit sent, as quoted from the pool before submitting
    pub quoted_rate: Option<f64>,
    /// Amount the quote promised before slippage
    pub expected_amount: Option<f64>,
    pub realized_slippage_percent: Option<f64>,
    pub slippage_bound_percent: f64,
    pub failure: Option<SwapFailure>,
}

impl SwapOutcome {
    pub fn failed(direction: TradeDirection, slippage: f64, failure: SwapFailure) -> Self {
        Self {
            success: false,
            direction,
            transaction_hash: None,
            amount_sent: None,
            amount_received: None,
            effective_rate: None,
            quoted_rate: None,
            expected_amount: None,
            realized_slippage_percent: None,
            slippage_bound_percent: slippage,
            failure: Some(failure),
        }
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }
}

/// Realised slippage in percent: how far `actual` fell short of `quoted`
pub fn realized_slippage_percent(actual_rate: f64, quoted_rate: f64) -> Option<f64> {
    (quoted_rate > 0.0 && actual_rate.is_finite()).then(|| (1.0 - actual_rate / quoted_rate) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_has_no_derived_fields() {
        let outcome = SwapOutcome::failed(TradeDirection::Buy, 4.0, SwapFailure::PoolNotFound);
        assert!(!outcome.success);
        assert!(outcome.effective_rate.is_none());
        assert!(outcome.realized_slippage_percent.is_none());
        assert_eq!(
            outcome.failure_reason().as_deref(),
            Some("AMM pool not found for this token pair")
        );
    }

    #[test]
    fn test_realized_slippage() {
        let s = realized_slippage_percent(48.0, 50.0).unwrap();
        assert!((s - 4.0).abs() < 1e-9);
        assert_eq!(realized_slippage_percent(1.0, 0.0), None);
    }

    #[test]
    fn test_direction_serde() {
        assert_eq!(serde_json::to_string(&TradeDirection::Sell).unwrap(), "\"sell\"");
        assert_eq!(serde_json::to_string(&TradeMechanism::Orderbook).unwrap(), "\"orderbook\"");
    }
}
