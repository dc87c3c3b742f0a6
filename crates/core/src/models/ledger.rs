//! Ledger-level records: amounts, transaction metadata, pools and accounts

use super::TokenIdentity;
use crate::types::{ripple_time_to_utc, Xrp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result code of a successfully applied transaction
pub const TES_SUCCESS: &str = "tesSUCCESS";

// ─── Amounts ─────────────────────────────────────────────────────────

/// An issued-currency amount (`{currency, issuer, value}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub currency: String,
    pub issuer: String,
    pub value: String,
}

impl IssuedAmount {
    pub fn value_f64(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn token(&self) -> TokenIdentity {
        TokenIdentity::new(self.currency.clone(), self.issuer.clone())
    }
}

/// A ledger amount: either native drops (a decimal string) or an issued amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Native(String),
    Issued(IssuedAmount),
}

impl Amount {
    /// Parse an amount field; anything else yields `None`
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Native quantity in XRP, if this is a drops amount
    pub fn as_xrp(&self) -> Option<f64> {
        match self {
            Amount::Native(drops) => Xrp::from_drops_str(drops).map(|x| x.as_f64()),
            Amount::Issued(_) => None,
        }
    }

    pub fn as_issued(&self) -> Option<&IssuedAmount> {
        match self {
            Amount::Issued(issued) => Some(issued),
            Amount::Native(_) => None,
        }
    }
}

/// Read an amount from a field map, accepting either the canonical
/// PascalCase key or its lower-case spelling.
pub fn amount_field(fields: &Value, key: &str) -> Option<Amount> {
    fields
        .get(key)
        .or_else(|| fields.get(key.to_ascii_lowercase()))
        .and_then(Amount::from_json)
}

// ─── Transaction metadata ────────────────────────────────────────────

/// A ledger entry touched by a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LedgerNode {
    pub ledger_entry_type: String,
    #[serde(default)]
    pub ledger_index: Option<String>,
    #[serde(default)]
    pub final_fields: Option<Value>,
    #[serde(default)]
    pub previous_fields: Option<Value>,
    #[serde(default)]
    pub new_fields: Option<Value>,
}

impl LedgerNode {
    pub fn is_type(&self, entry_type: &str) -> bool {
        self.ledger_entry_type == entry_type
    }

    pub fn final_amount(&self, key: &str) -> Option<Amount> {
        self.final_fields.as_ref().and_then(|f| amount_field(f, key))
    }

    pub fn previous_amount(&self, key: &str) -> Option<Amount> {
        self.previous_fields.as_ref().and_then(|f| amount_field(f, key))
    }
}

/// One entry of a transaction's `AffectedNodes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AffectedNode {
    CreatedNode(LedgerNode),
    ModifiedNode(LedgerNode),
    DeletedNode(LedgerNode),
}

impl AffectedNode {
    pub fn node(&self) -> &LedgerNode {
        match self {
            AffectedNode::CreatedNode(n)
            | AffectedNode::ModifiedNode(n)
            | AffectedNode::DeletedNode(n) => n,
        }
    }
}

/// Parse `meta.AffectedNodes`, dropping entries of unknown shape
pub fn parse_affected_nodes(meta: &Value) -> Vec<AffectedNode> {
    meta.get("AffectedNodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(|n| serde_json::from_value::<AffectedNode>(n.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// A settled transaction normalised from `account_tx` or `ledger` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    /// Initiating account
    pub account: String,
    pub transaction_type: String,
    /// `meta.TransactionResult`, if metadata was present
    pub result_code: Option<String>,
    /// Close time in seconds since the ripple epoch
    pub date: Option<i64>,
    pub ledger_index: Option<u64>,
    /// The raw transaction fields
    pub tx: Value,
    pub affected_nodes: Vec<AffectedNode>,
}

impl TransactionRecord {
    /// Normalise one transaction entry.
    ///
    /// Accepts the API v1 shape (`{tx, meta}` or a flat transaction with
    /// `metaData`) and the v2 shape (`{tx_json, meta, hash}`). Returns `None`
    /// if no hash can be found.
    pub fn from_ledger_json(entry: &Value) -> Option<Self> {
        let tx = entry
            .get("tx_json")
            .or_else(|| entry.get("tx"))
            .unwrap_or(entry);
        let meta = entry
            .get("meta")
            .or_else(|| entry.get("metaData"))
            .or_else(|| tx.get("metaData"));

        let hash = tx
            .get("hash")
            .or_else(|| entry.get("hash"))
            .and_then(Value::as_str)?
            .to_string();

        let str_field = |key: &str| tx.get(key).and_then(Value::as_str).map(str::to_string);
        let int_field = |key: &str| {
            tx.get(key)
                .or_else(|| entry.get(key))
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        };

        Some(Self {
            hash,
            account: str_field("Account").unwrap_or_default(),
            transaction_type: str_field("TransactionType").unwrap_or_default(),
            result_code: meta
                .and_then(|m| m.get("TransactionResult"))
                .and_then(Value::as_str)
                .map(str::to_string),
            date: int_field("date").map(|d| d as i64),
            ledger_index: int_field("ledger_index"),
            tx: tx.clone(),
            affected_nodes: meta.map(parse_affected_nodes).unwrap_or_default(),
        })
    }

    pub fn succeeded(&self) -> bool {
        self.result_code.as_deref() == Some(TES_SUCCESS)
    }

    pub fn is_type(&self, transaction_type: &str) -> bool {
        self.transaction_type == transaction_type
    }

    /// Read an amount field (`Amount`, `Amount2`, ...) from the transaction
    pub fn amount(&self, key: &str) -> Option<Amount> {
        self.tx.get(key).and_then(Amount::from_json)
    }

    pub fn executed_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.date.and_then(ripple_time_to_utc)
    }
}

/// One validated ledger close and its transactions
#[derive(Debug, Clone, Default)]
pub struct LedgerClose {
    pub ledger_index: u64,
    pub transactions: Vec<TransactionRecord>,
}

/// Paging parameters for `account_tx`
#[derive(Debug, Clone, Copy)]
pub struct AccountTxParams {
    pub limit: u32,
    /// Oldest first when true
    pub forward: bool,
}

impl AccountTxParams {
    pub fn latest(limit: u32) -> Self {
        Self { limit, forward: false }
    }

    pub fn oldest_first(limit: u32) -> Self {
        Self { limit, forward: true }
    }
}

// ─── Accounts and pools ──────────────────────────────────────────────

/// Subset of `account_info` the engine needs
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub address: String,
    /// Native balance in XRP
    pub balance: f64,
    pub sequence: u32,
}

/// One read of AMM pool state. Never cached; re-read before each use.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    pub token: TokenIdentity,
    /// Native reserve in XRP
    pub xrp_reserve: f64,
    /// Token reserve as reported by the ledger (decimal string)
    pub token_reserve: String,
    /// The pool's own custodial account
    pub pool_account: String,
    /// Outstanding LP tokens, if reported
    pub lp_token: Option<IssuedAmount>,
}

impl PoolSnapshot {
    pub fn token_reserve_f64(&self) -> Option<f64> {
        self.token_reserve.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Tokens per XRP at the current reserves
    pub fn tokens_per_xrp(&self) -> Option<f64> {
        let tokens = self.token_reserve_f64()?;
        (self.xrp_reserve > 0.0 && tokens > 0.0).then(|| tokens / self.xrp_reserve)
    }

    /// XRP per token at the current reserves
    pub fn xrp_per_token(&self) -> Option<f64> {
        let tokens = self.token_reserve_f64()?;
        (self.xrp_reserve > 0.0 && tokens > 0.0).then(|| self.xrp_reserve / tokens)
    }
}

/// Result of submitting a signed transaction and waiting for validation
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub result_code: String,
    pub hash: String,
    /// Fee charged, in drops
    pub fee_drops: Option<u64>,
    pub validated: bool,
    pub affected_nodes: Vec<AffectedNode>,
}

impl SubmitOutcome {
    pub fn succeeded(&self) -> bool {
        self.result_code == TES_SUCCESS
    }

    pub fn fee_xrp(&self) -> f64 {
        self.fee_drops.map(|d| d as f64 / crate::DROPS_PER_XRP).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_shapes() {
        let native = Amount::from_json(&json!("10000000")).unwrap();
        assert_eq!(native.as_xrp(), Some(10.0));
        assert!(native.as_issued().is_none());

        let issued = Amount::from_json(&json!({
            "currency": "USD", "issuer": "rIssuer", "value": "1.5"
        }))
        .unwrap();
        assert_eq!(issued.as_xrp(), None);
        assert_eq!(issued.as_issued().unwrap().value_f64(), Some(1.5));

        assert!(Amount::from_json(&json!(42)).is_none());
    }

    #[test]
    fn test_record_from_v1_shape() {
        let entry = json!({
            "tx": {
                "Account": "rTrader",
                "TransactionType": "Payment",
                "hash": "ABC",
                "date": 700000000,
                "ledger_index": 90000000
            },
            "meta": {
                "TransactionResult": "tesSUCCESS",
                "AffectedNodes": [
                    { "ModifiedNode": { "LedgerEntryType": "AMM", "FinalFields": {}, "PreviousFields": {} } },
                    { "SomethingElse": {} }
                ]
            },
            "validated": true
        });
        let record = TransactionRecord::from_ledger_json(&entry).unwrap();
        assert_eq!(record.hash, "ABC");
        assert_eq!(record.account, "rTrader");
        assert!(record.succeeded());
        assert!(record.is_type("Payment"));
        assert_eq!(record.ledger_index, Some(90000000));
        assert_eq!(record.affected_nodes.len(), 1);
        assert!(record.executed_at().is_some());
    }

    #[test]
    fn test_record_from_v2_shape() {
        let entry = json!({
            "hash": "DEF",
            "ledger_index": 5,
            "tx_json": { "Account": "rCreator", "TransactionType": "AMMCreate", "Amount": "1000000" },
            "meta": { "TransactionResult": "tecDUPLICATE", "AffectedNodes": [] }
        });
        let record = TransactionRecord::from_ledger_json(&entry).unwrap();
        assert_eq!(record.hash, "DEF");
        assert_eq!(record.ledger_index, Some(5));
        assert!(!record.succeeded());
        assert_eq!(record.amount("Amount").and_then(|a| a.as_xrp()), Some(1.0));
    }

    #[test]
    fn test_record_without_hash_rejected() {
        assert!(TransactionRecord::from_ledger_json(&json!({ "tx": { "Account": "r" } })).is_none());
    }

    #[test]
    fn test_pool_rates() {
        let pool = PoolSnapshot {
            token: TokenIdentity::new("USD", "rIssuer"),
            xrp_reserve: 100.0,
            token_reserve: "5000".to_string(),
            pool_account: "rPool".to_string(),
            lp_token: None,
        };
        assert_eq!(pool.tokens_per_xrp(), Some(50.0));
        assert_eq!(pool.xrp_per_token(), Some(0.02));

        let empty = PoolSnapshot { xrp_reserve: 0.0, ..pool };
        assert_eq!(empty.tokens_per_xrp(), None);
    }
}
