//! The ledger read/submit surface the engine depends on
//!
//! Everything the engine asks of the network goes through this trait so the
//! engine can be driven by a scripted gateway in tests.

use async_trait::async_trait;
use serde_json::Value;
use xrpl_trader_core::{
    AccountInfo, AccountTxParams, LedgerClose, PoolSnapshot, Result, SubmitOutcome,
    TokenIdentity, TransactionRecord, TrustLine,
};

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Settled transactions of `address`, in the order requested by `params`
    async fn account_transactions(
        &self,
        address: &str,
        params: AccountTxParams,
    ) -> Result<Vec<TransactionRecord>>;

    /// The XRP/`token` AMM pool, or `None` if the pair has no pool
    async fn pool_info(&self, token: &TokenIdentity) -> Result<Option<PoolSnapshot>>;

    /// Trust lines held by `address` (empty for an unfunded account)
    async fn account_trust_lines(&self, address: &str) -> Result<Vec<TrustLine>>;

    async fn account_info(&self, address: &str) -> Result<AccountInfo>;

    /// Fill in `Sequence`, `Fee` and `LastLedgerSequence` for a transaction
    async fn autofill(&self, tx_json: Value) -> Result<Value>;

    /// Submit a signed blob and block until the transaction is validated
    async fn submit_signed(&self, tx_blob: &str) -> Result<SubmitOutcome>;

    /// The latest validated ledger close and up to `depth - 1` before it
    async fn latest_validated_ledgers(&self, depth: u32) -> Result<Vec<LedgerClose>>;
}
