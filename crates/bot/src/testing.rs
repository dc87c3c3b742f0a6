//! App state over the engine's scripted gateway, plus ledger fixtures

use crate::config::AppConfig;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use xrpl_trader_core::{LedgerClose, TokenIdentity, TransactionRecord, RIPPLE_EPOCH_OFFSET};
use xrpl_trader_engine::testing::{MockGateway, MockSigner};
use xrpl_trader_engine::{ExecutorOptions, SwapExecutor};
use xrpl_trader_persistence::Database;

pub use xrpl_trader_engine::testing::{pool, settled, trust_line, WALLET};

pub fn foo() -> TokenIdentity {
    TokenIdentity::new("FOO", "rIssuer")
}

/// App state over an in-memory database, polling every 20ms with no settle delay
pub async fn state_with(gateway: Arc<MockGateway>) -> AppState {
    let mut config = AppConfig::from_lookup(|key| match key {
        "WALLET_SEED" => Some("sTest".to_string()),
        "WALLET_ADDRESS" => Some(WALLET.to_string()),
        _ => None,
    })
    .unwrap();
    config.sniper_check_interval = Duration::from_millis(20);
    config.copy_trading_check_interval = Duration::from_millis(20);

    let db = Database::connect_in_memory().await.unwrap();
    let mut state = AppState::from_parts(config, db, gateway.clone(), Arc::new(MockSigner));
    state.executor = Arc::new(SwapExecutor::with_options(
        gateway,
        Arc::new(MockSigner),
        ExecutorOptions {
            settle_delay: Duration::ZERO,
            ..ExecutorOptions::default()
        },
    ));
    state
}

pub async fn idle_state() -> AppState {
    state_with(Arc::new(MockGateway::new())).await
}

/// A successful XRP/FOO `AMMCreate` by `creator` depositing 500 XRP
pub fn amm_create(hash: &str, creator: &str) -> TransactionRecord {
    TransactionRecord::from_ledger_json(&json!({
        "hash": hash,
        "tx_json": {
            "Account": creator,
            "TransactionType": "AMMCreate",
            "Amount": "500000000",
            "Amount2": { "currency": "FOO", "issuer": "rIssuer", "value": "1000000" },
        },
        "meta": { "TransactionResult": "tesSUCCESS", "AffectedNodes": [] }
    }))
    .unwrap()
}

pub fn ledger_with(transactions: Vec<TransactionRecord>) -> LedgerClose {
    LedgerClose {
        ledger_index: 100,
        transactions,
    }
}

fn foo_amount(value: &str) -> Value {
    json!({ "currency": "FOO", "issuer": "rIssuer", "value": value })
}

/// A trader's XRP/FOO pool swap, given the pool's reserves before and after
pub fn amm_swap(
    hash: &str,
    trader: &str,
    when: DateTime<Utc>,
    drops: (&str, &str),
    tokens: (&str, &str),
) -> TransactionRecord {
    TransactionRecord::from_ledger_json(&json!({
        "tx": {
            "Account": trader,
            "TransactionType": "Payment",
            "hash": hash,
            "date": when.timestamp() - RIPPLE_EPOCH_OFFSET,
        },
        "meta": {
            "TransactionResult": "tesSUCCESS",
            "AffectedNodes": [{ "ModifiedNode": {
                "LedgerEntryType": "AMM",
                "PreviousFields": { "Amount": drops.0, "Amount2": foo_amount(tokens.0) },
                "FinalFields": { "Amount": drops.1, "Amount2": foo_amount(tokens.1) }
            }}]
        }
    }))
    .unwrap()
}
