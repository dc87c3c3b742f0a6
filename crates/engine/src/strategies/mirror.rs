//! Copy trading: sizing policy and the trader-history monitor

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use xrpl_trader_core::{AccountTxParams, CopyAmountMode, Result, TradeEvent};
use xrpl_trader_networking::LedgerGateway;

use crate::classifier::TradeClassifier;

/// Trades older than this are not copied
pub const MAX_TRADE_AGE_SECS: i64 = 60;

/// Share of the observed amount used when no fixed amount is configured
const FALLBACK_FRACTION: f64 = 0.10;

/// XRP to commit to a copy of a trade that moved `observed_xrp`.
///
/// `None` means the trade must be skipped.
pub fn compute_copy_amount(observed_xrp: f64, mode: &CopyAmountMode) -> Option<f64> {
    let amount = match *mode {
        CopyAmountMode::Fixed { amount } => amount,
        CopyAmountMode::Percentage { percent, max_spend } => {
            let scaled = observed_xrp * percent / 100.0;
            match max_spend {
                Some(cap) => scaled.min(cap),
                None => scaled,
            }
        }
        CopyAmountMode::Fallback { fixed: Some(amount) } => amount,
        CopyAmountMode::Fallback { fixed: None } => observed_xrp * FALLBACK_FRACTION,
    };

    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// Tokens to sell when copying a sell worth `copy_xrp`, priced at the
/// observed trade's rate and capped at what we hold.
pub fn copy_sell_amount(copy_xrp: f64, event: &TradeEvent, held: f64) -> Option<f64> {
    let tokens = copy_xrp * event.tokens_per_xrp()?;
    let tokens = tokens.min(held);
    (tokens.is_finite() && tokens > 0.0).then_some(tokens)
}

/// A classified trade by a followed trader, ready to be copied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedTrade {
    pub tx_hash: String,
    pub trader: String,
    pub event: TradeEvent,
    /// `None` when the ledger reported no close time for the transaction
    pub executed_at: Option<DateTime<Utc>>,
}

/// Fetch `trader`'s latest transactions and classify the fresh ones.
///
/// Skips failed transactions, anything older than `MAX_TRADE_AGE_SECS`
/// relative to `now`, and anything executed before `start_watermark`.
/// Transactions without a close time are kept.
/// Results are oldest first. The classifier lock is only held while
/// classifying, not across the ledger round-trip.
#[instrument(skip(gateway, classifier))]
pub async fn check_trader_transactions(
    gateway: &dyn LedgerGateway,
    classifier: &Mutex<TradeClassifier>,
    trader: &str,
    start_watermark: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<ObservedTrade>> {
    let records = gateway
        .account_transactions(trader, AccountTxParams::latest(limit))
        .await?;

    let oldest_allowed = now - Duration::seconds(MAX_TRADE_AGE_SECS);
    let mut classifier = classifier.lock().await;
    let mut trades = Vec::new();

    for record in records.iter().rev() {
        if !record.succeeded() {
            continue;
        }
        // Undated records cannot be aged, so they pass both time filters
        let executed_at = record.executed_at();
        if executed_at.is_some_and(|at| at < oldest_allowed) {
            continue;
        }
        if let (Some(at), Some(start)) = (executed_at, start_watermark) {
            if at < start {
                continue;
            }
        }

        if let Some(event) = classifier.classify(record, trader) {
            trades.push(ObservedTrade {
                tx_hash: record.hash.clone(),
                trader: trader.to_string(),
                event,
                executed_at,
            });
        }
    }

    debug!(
        "CopyTrader: {} trades from {} of {} transactions",
        trades.len(),
        trader,
        records.len()
    );
    Ok(trades)
}
