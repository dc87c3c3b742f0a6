//! Scripted gateway and signer for tests of the engine and its callers

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use xrpl_trader_core::{
    AccountInfo, AccountTxParams, Error, LedgerClose, PoolSnapshot, Result, SubmitOutcome,
    TokenIdentity, TransactionRecord, TrustLine, TES_SUCCESS,
};
use xrpl_trader_networking::{LedgerGateway, TransactionSigner};

pub const WALLET: &str = "rWallet";

/// Replays queued responses; the last one repeats once the queue drains
struct Script<T: Clone>(Vec<T>);

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Script(Vec::new())
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self) -> Option<T> {
        if self.0.len() > 1 {
            Some(self.0.remove(0))
        } else {
            self.0.first().cloned()
        }
    }
}

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<String>>,
    account_txs: Mutex<HashMap<String, Vec<TransactionRecord>>>,
    pools: Mutex<HashMap<TokenIdentity, PoolSnapshot>>,
    lines: Mutex<HashMap<String, Script<Vec<TrustLine>>>>,
    balances: Mutex<HashMap<String, Script<f64>>>,
    submits: Mutex<Script<SubmitOutcome>>,
    ledgers: Mutex<Vec<LedgerClose>>,
    fail_all: Mutex<bool>,
    fail_once: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_txs(self, address: &str, records: Vec<TransactionRecord>) -> Self {
        self.account_txs.lock().unwrap().insert(address.to_string(), records);
        self
    }

    pub fn with_pool(self, pool: PoolSnapshot) -> Self {
        self.pools.lock().unwrap().insert(pool.token.clone(), pool);
        self
    }

    /// Queue successive `account_lines` responses for `address`
    pub fn with_lines(self, address: &str, responses: Vec<Vec<TrustLine>>) -> Self {
        self.lines.lock().unwrap().insert(address.to_string(), Script(responses));
        self
    }

    /// Queue successive native balances for `address`
    pub fn with_balances(self, address: &str, balances: Vec<f64>) -> Self {
        self.balances.lock().unwrap().insert(address.to_string(), Script(balances));
        self
    }

    /// Queue successive submit results
    pub fn with_submits(self, outcomes: Vec<SubmitOutcome>) -> Self {
        *self.submits.lock().unwrap() = Script(outcomes);
        self
    }

    pub fn with_ledgers(self, ledgers: Vec<LedgerClose>) -> Self {
        *self.ledgers.lock().unwrap() = ledgers;
        self
    }

    /// Every call fails with a network error
    pub fn failing(self) -> Self {
        *self.fail_all.lock().unwrap() = true;
        self
    }

    /// The next call whose log entry starts with `prefix` fails; later ones succeed
    pub fn fail_next(self, prefix: &str) -> Self {
        self.fail_once.lock().unwrap().push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) -> Result<()> {
        let refused = || Err(Error::NetworkError("connection refused".to_string()));
        if *self.fail_all.lock().unwrap() {
            self.calls.lock().unwrap().push(call);
            return refused();
        }

        let mut fail_once = self.fail_once.lock().unwrap();
        let pending = fail_once.iter().position(|prefix| call.starts_with(prefix.as_str()));
        self.calls.lock().unwrap().push(call);
        if let Some(index) = pending {
            fail_once.remove(index);
            return refused();
        }
        Ok(())
    }
}

pub fn settled(result_code: &str, hash: &str) -> SubmitOutcome {
    SubmitOutcome {
        result_code: result_code.to_string(),
        hash: hash.to_string(),
        fee_drops: Some(12),
        validated: result_code == TES_SUCCESS,
        affected_nodes: Vec::new(),
    }
}

pub fn trust_line(token: &TokenIdentity, balance: f64, limit: f64) -> TrustLine {
    TrustLine {
        account: token.issuer.clone(),
        currency: token.currency.clone(),
        balance,
        limit,
    }
}

pub fn pool(token: &TokenIdentity, xrp_reserve: f64, token_reserve: &str) -> PoolSnapshot {
    PoolSnapshot {
        token: token.clone(),
        xrp_reserve,
        token_reserve: token_reserve.to_string(),
        pool_account: "rPool".to_string(),
        lp_token: Some(xrpl_trader_core::IssuedAmount {
            currency: "03ABCDEF00000000000000000000000000000000".to_string(),
            issuer: "rPool".to_string(),
            value: "1000".to_string(),
        }),
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn account_transactions(
        &self,
        address: &str,
        params: AccountTxParams,
    ) -> Result<Vec<TransactionRecord>> {
        self.record(format!("account_tx:{}:{}", address, params.limit))?;
        let mut records = self
            .account_txs
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();
        records.truncate(params.limit as usize);
        Ok(records)
    }

    async fn pool_info(&self, token: &TokenIdentity) -> Result<Option<PoolSnapshot>> {
        self.record(format!("amm_info:{}", token))?;
        Ok(self.pools.lock().unwrap().get(token).cloned())
    }

    async fn account_trust_lines(&self, address: &str) -> Result<Vec<TrustLine>> {
        self.record(format!("account_lines:{}", address))?;
        Ok(self
            .lines
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(Script::next)
            .unwrap_or_default())
    }

    async fn account_info(&self, address: &str) -> Result<AccountInfo> {
        self.record(format!("account_info:{}", address))?;
        let balance = self
            .balances
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(Script::next)
            .ok_or_else(|| Error::NotFound(address.to_string()))?;
        Ok(AccountInfo {
            address: address.to_string(),
            balance,
            sequence: 1,
        })
    }

    async fn autofill(&self, mut tx_json: Value) -> Result<Value> {
        self.record("autofill".to_string())?;
        tx_json["Sequence"] = Value::from(1);
        tx_json["Fee"] = Value::from("12");
        Ok(tx_json)
    }

    async fn submit_signed(&self, tx_blob: &str) -> Result<SubmitOutcome> {
        self.record(format!("submit:{}", tx_blob))?;
        self.submits
            .lock()
            .unwrap()
            .next()
            .ok_or_else(|| Error::Unknown("no scripted submit result".to_string()))
    }

    async fn latest_validated_ledgers(&self, depth: u32) -> Result<Vec<LedgerClose>> {
        self.record(format!("ledger:{}", depth))?;
        let mut ledgers = self.ledgers.lock().unwrap().clone();
        ledgers.truncate(depth as usize);
        Ok(ledgers)
    }
}

/// Signs by echoing the transaction type, so submits can be told apart in `calls()`
pub struct MockSigner;

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> &str {
        WALLET
    }

    async fn sign(&self, tx_json: &Value) -> Result<String> {
        Ok(tx_json
            .get("TransactionType")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string())
    }
}
