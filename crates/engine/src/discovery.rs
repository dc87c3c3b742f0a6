//! Pool Discovery: new AMM pools in the latest validated ledgers

use tracing::{debug, instrument, warn};
use xrpl_trader_core::{Amount, DiscoveredPool, Result, TransactionRecord};
use xrpl_trader_networking::LedgerGateway;

/// Number of ledger closes scanned: the latest validated one and the three before it
pub const DISCOVERY_DEPTH: u32 = 4;

/// Scan recent ledger closes for successful `AMMCreate` transactions.
///
/// The result is not deduplicated; overlapping scans report the same pool
/// again and callers filter by transaction hash.
#[instrument(skip(gateway))]
pub async fn discover_new_pools(gateway: &dyn LedgerGateway) -> Result<Vec<DiscoveredPool>> {
    let ledgers = gateway.latest_validated_ledgers(DISCOVERY_DEPTH).await?;

    let pools: Vec<DiscoveredPool> = ledgers
        .iter()
        .flat_map(|ledger| ledger.transactions.iter())
        .filter(|tx| tx.is_type("AMMCreate") && tx.succeeded())
        .filter_map(pool_from_create)
        .collect();

    if !pools.is_empty() {
        debug!("Discovery: {} pool creations in {} ledgers", pools.len(), ledgers.len());
    }
    Ok(pools)
}

/// Extract the new pool from one `AMMCreate` transaction.
///
/// One side must be an issued token. The other side, when it is native XRP,
/// gives the initial liquidity; when it is absent the liquidity is unknown.
pub fn pool_from_create(tx: &TransactionRecord) -> Option<DiscoveredPool> {
    let sides = [tx.amount("Amount"), tx.amount("Amount2")];

    let mut native = None;
    let mut issued = None;
    for side in sides.iter().flatten() {
        match side {
            Amount::Native(_) => native = side.as_xrp(),
            Amount::Issued(amount) => {
                if issued.is_some() {
                    warn!("Discovery: skipping token/token pool {}", tx.hash);
                    return None;
                }
                issued = Some(amount.clone());
            }
        }
    }

    let issued = issued?;
    let token = issued.token();
    Some(DiscoveredPool {
        readable_symbol: token.readable_symbol(),
        token,
        initial_xrp_liquidity: native,
        initial_token_amount: Some(issued.value),
        transaction_hash: tx.hash.clone(),
        creator: tx.account.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use serde_json::{json, Value};
    use xrpl_trader_core::{LedgerClose, TokenIdentity};

    fn create(hash: &str, result: &str, amount: Value, amount2: Value) -> TransactionRecord {
        TransactionRecord::from_ledger_json(&json!({
            "hash": hash,
            "tx_json": {
                "Account": "rCreator",
                "TransactionType": "AMMCreate",
                "Amount": amount,
                "Amount2": amount2,
            },
            "meta": { "TransactionResult": result, "AffectedNodes": [] }
        }))
        .unwrap()
    }

    fn token() -> Value {
        json!({ "currency": "FOO", "issuer": "rIssuer", "value": "1000000" })
    }

    #[tokio::test]
    async fn test_discovers_successful_creations() {
        let ledgers = vec![
            LedgerClose {
                ledger_index: 100,
                transactions: vec![
                    create("A", "tesSUCCESS", json!("250000000"), token()),
                    create("B", "tecDUPLICATE", json!("250000000"), token()),
                ],
            },
            LedgerClose {
                ledger_index: 99,
                transactions: vec![create("C", "tesSUCCESS", token(), json!("5000000"))],
            },
        ];
        let gateway = MockGateway::new().with_ledgers(ledgers);

        let pools = discover_new_pools(&gateway).await.unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].transaction_hash, "A");
        assert_eq!(pools[0].initial_xrp_liquidity, Some(250.0));
        assert_eq!(pools[0].token, TokenIdentity::new("FOO", "rIssuer"));
        assert_eq!(pools[0].creator, "rCreator");
        assert_eq!(pools[1].initial_xrp_liquidity, Some(5.0));
        assert_eq!(gateway.calls(), vec!["ledger:4".to_string()]);
    }

    #[test]
    fn test_missing_native_side_has_unknown_liquidity() {
        let tx = create("D", "tesSUCCESS", Value::Null, token());
        let pool = pool_from_create(&tx).unwrap();
        assert_eq!(pool.initial_xrp_liquidity, None);
        assert_eq!(pool.initial_token_amount.as_deref(), Some("1000000"));
    }

    #[test]
    fn test_token_token_pool_skipped() {
        let other = json!({ "currency": "BAR", "issuer": "rOther", "value": "5" });
        assert!(pool_from_create(&create("E", "tesSUCCESS", token(), other)).is_none());
        assert!(pool_from_create(&create("F", "tesSUCCESS", json!("1"), json!("2"))).is_none());
    }

    #[tokio::test]
    async fn test_gateway_error_propagates() {
        let gateway = MockGateway::new().failing();
        assert!(discover_new_pools(&gateway).await.is_err());
    }
}
