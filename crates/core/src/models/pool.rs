//! Pool discovery and snipe evaluation models

use super::TokenIdentity;
use serde::{Deserialize, Serialize};

/// A pool found in a recent `AMMCreate` transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredPool {
    pub token: TokenIdentity,
    pub readable_symbol: String,
    /// XRP deposited at creation; `None` when the payload carried no native amount
    pub initial_xrp_liquidity: Option<f64>,
    /// Tokens deposited at creation
    pub initial_token_amount: Option<String>,
    pub transaction_hash: String,
    pub creator: String,
}

/// Outcome of running the snipe gates over a candidate.
///
/// `reasons` holds one entry per gate traversed, ending with the gate that
/// failed (or every applicable gate on a full pass).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationVerdict {
    pub should_act: bool,
    pub reasons: Vec<String>,
    /// The rejection came from a failed ledger lookup, not a policy gate,
    /// so the same candidate may pass on a later attempt
    #[serde(default)]
    pub retryable: bool,
}

impl EvaluationVerdict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a passed gate
    pub fn pass(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Record a failed gate and close the verdict
    pub fn reject(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self.should_act = false;
        self
    }

    /// Record a gate that could not be decided because a lookup failed
    pub fn reject_retryable(mut self, reason: impl Into<String>) -> Self {
        self.retryable = true;
        self.reject(reason)
    }

    /// Close the verdict after every gate passed
    pub fn approve(mut self) -> Self {
        self.should_act = true;
        self
    }

    pub fn summary(&self) -> String {
        self.reasons.join(", ")
    }
}
