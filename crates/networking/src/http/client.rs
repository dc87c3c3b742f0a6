//! XRPL JSON-RPC client over HTTPS

use crate::gateway::LedgerGateway;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use xrpl_trader_core::{
    parse_affected_nodes, AccountInfo, AccountTxParams, Amount, Error, IssuedAmount, LedgerClose,
    PoolSnapshot, Result, SubmitOutcome, TokenIdentity, TransactionRecord, TrustLine, Xrp,
};

pub const DEFAULT_RPC_URL: &str = "https://xrplcluster.com";

/// Minimum fee we will attach, in drops
const BASE_FEE_DROPS: u64 = 12;

/// Page size for `account_lines`
const ACCOUNT_LINES_PAGE: u32 = 400;

/// Upper bound on `account_lines` pages fetched for one account
const MAX_ACCOUNT_LINES_PAGES: usize = 10;

/// Engine-result prefixes that mean the transaction can never be applied
const TERMINAL_PREFIXES: [&str; 3] = ["tem", "tef", "tel"];

/// Tunables for the client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Delay between `tx` polls while waiting for validation
    pub settle_poll_interval: Duration,
    /// Number of `tx` polls before giving up on validation
    pub settle_max_attempts: u32,
    /// Ledgers of headroom given to `LastLedgerSequence`
    pub last_ledger_offset: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            settle_poll_interval: Duration::from_secs(1),
            settle_max_attempts: 30,
            last_ledger_offset: 20,
        }
    }
}

/// HTTP client for a ledger node's JSON-RPC API
///
/// One instance is shared by every user session; requests are independent
/// so no correlation state is kept here.
pub struct XrplClient {
    http: Client,
    url: String,
    options: ClientOptions,
}

impl XrplClient {
    /// Create a client for the JSON-RPC endpoint at `url`
    pub fn new(url: &str) -> Result<Self> {
        Self::with_options(url, ClientOptions::default())
    }

    pub fn with_options(url: &str, options: ClientOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            options,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and return its `result` object
    #[instrument(skip(self, params))]
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({ "method": method, "params": [params] });

        let response = self.http.post(&self.url).json(&body).send().await?;

        let response = response.error_for_status().map_err(|e| {
            error!("{} request failed: {}", method, e);
            Error::NetworkError(e.to_string())
        })?;

        let mut envelope: Value = response.json().await.map_err(|e| {
            error!("Failed to parse {} response: {}", method, e);
            Error::InvalidData(e.to_string())
        })?;

        let result = envelope
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| Error::InvalidData(format!("{} response has no result", method)))?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let code = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let message = result
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or(code.as_str())
                .to_string();
            debug!("{} returned error {}: {}", method, code, message);
            return Err(Error::RpcError { code, message });
        }

        Ok(result)
    }

    /// Ask the node to sign `tx_json` with `secret` and return the blob
    #[instrument(skip(self, tx_json, secret))]
    pub async fn sign_with_secret(&self, tx_json: &Value, secret: &str) -> Result<String> {
        let result = self
            .request(
                "sign",
                json!({ "tx_json": tx_json, "secret": secret, "offline": false }),
            )
            .await
            .map_err(|e| Error::SigningError(e.to_string()))?;

        result
            .get("tx_blob")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::SigningError("sign response has no tx_blob".to_string()))
    }

    async fn fetch_ledger(&self, ledger_index: Value) -> Result<LedgerClose> {
        let result = self
            .request(
                "ledger",
                json!({ "ledger_index": ledger_index, "transactions": true, "expand": true }),
            )
            .await?;

        let ledger = result
            .get("ledger")
            .ok_or_else(|| Error::InvalidData("ledger response has no ledger".to_string()))?;

        let ledger_index = value_as_u64(ledger.get("ledger_index"))
            .or_else(|| value_as_u64(result.get("ledger_index")))
            .ok_or_else(|| Error::InvalidData("ledger response has no index".to_string()))?;

        let transactions = ledger
            .get("transactions")
            .and_then(Value::as_array)
            .map(|txs| txs.iter().filter_map(TransactionRecord::from_ledger_json).collect())
            .unwrap_or_default();

        Ok(LedgerClose {
            ledger_index,
            transactions,
        })
    }

    /// Poll `tx` until the transaction is validated or the budget runs out
    async fn wait_for_validation(&self, hash: &str) -> Result<SubmitOutcome> {
        for attempt in 1..=self.options.settle_max_attempts {
            tokio::time::sleep(self.options.settle_poll_interval).await;

            let result = match self.request("tx", json!({ "transaction": hash })).await {
                Ok(r) => r,
                Err(e) if e.is_not_found() => {
                    debug!("tx {} not found yet (attempt {})", hash, attempt);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if result.get("validated").and_then(Value::as_bool) != Some(true) {
                continue;
            }

            let meta = result.get("meta").cloned().unwrap_or(Value::Null);
            let result_code = meta
                .get("TransactionResult")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let fee_drops = value_as_u64(
                result
                    .get("Fee")
                    .or_else(|| result.get("tx_json").and_then(|t| t.get("Fee"))),
            );

            debug!("tx {} validated with {}", hash, result_code);
            return Ok(SubmitOutcome {
                result_code,
                hash: hash.to_string(),
                fee_drops,
                validated: true,
                affected_nodes: parse_affected_nodes(&meta),
            });
        }

        Err(Error::Timeout(format!(
            "transaction {} not validated after {} attempts",
            hash, self.options.settle_max_attempts
        )))
    }
}

#[async_trait]
impl LedgerGateway for XrplClient {
    #[instrument(skip(self))]
    async fn account_transactions(
        &self,
        address: &str,
        params: AccountTxParams,
    ) -> Result<Vec<TransactionRecord>> {
        let result = self
            .request(
                "account_tx",
                json!({
                    "account": address,
                    "ledger_index_min": -1,
                    "ledger_index_max": -1,
                    "limit": params.limit,
                    "forward": params.forward,
                }),
            )
            .await?;

        let records: Vec<TransactionRecord> = result
            .get("transactions")
            .and_then(Value::as_array)
            .map(|txs| txs.iter().filter_map(TransactionRecord::from_ledger_json).collect())
            .unwrap_or_default();

        debug!("account_tx {}: {} transactions", address, records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn pool_info(&self, token: &TokenIdentity) -> Result<Option<PoolSnapshot>> {
        let result = match self
            .request(
                "amm_info",
                json!({
                    "asset": { "currency": "XRP" },
                    "asset2": token.to_asset_json(),
                    "ledger_index": "validated",
                }),
            )
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let amm = match result.get("amm") {
            Some(amm) => amm,
            None => return Ok(None),
        };

        Ok(parse_pool_snapshot(amm, token))
    }

    #[instrument(skip(self))]
    async fn account_trust_lines(&self, address: &str) -> Result<Vec<TrustLine>> {
        let mut lines = Vec::new();
        let mut marker: Option<Value> = None;

        for _ in 0..MAX_ACCOUNT_LINES_PAGES {
            let mut params = json!({
                "account": address,
                "ledger_index": "validated",
                "limit": ACCOUNT_LINES_PAGE,
            });
            if let Some(m) = marker.take() {
                params["marker"] = m;
            }

            let result = match self.request("account_lines", params).await {
                Ok(r) => r,
                Err(e) if e.is_not_found() => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            if let Some(page) = result.get("lines") {
                let page: Vec<TrustLine> = serde_json::from_value(page.clone())?;
                lines.extend(page);
            }

            match result.get("marker") {
                Some(m) if !m.is_null() => marker = Some(m.clone()),
                _ => return Ok(lines),
            }
        }

        warn!("account_lines for {} truncated after {} pages", address, MAX_ACCOUNT_LINES_PAGES);
        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn account_info(&self, address: &str) -> Result<AccountInfo> {
        let result = self
            .request(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;

        let data = result
            .get("account_data")
            .ok_or_else(|| Error::InvalidData("account_info has no account_data".to_string()))?;

        let balance = data
            .get("Balance")
            .and_then(Value::as_str)
            .and_then(Xrp::from_drops_str)
            .ok_or_else(|| Error::InvalidData("account_info has no Balance".to_string()))?;
        let sequence = value_as_u64(data.get("Sequence"))
            .ok_or_else(|| Error::InvalidData("account_info has no Sequence".to_string()))?;

        Ok(AccountInfo {
            address: address.to_string(),
            balance: balance.as_f64(),
            sequence: sequence as u32,
        })
    }

    #[instrument(skip(self, tx_json))]
    async fn autofill(&self, mut tx_json: Value) -> Result<Value> {
        let account = tx_json
            .get("Account")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidData("transaction has no Account".to_string()))?;

        if tx_json.get("Sequence").is_none() {
            let info = self.account_info(&account).await?;
            tx_json["Sequence"] = json!(info.sequence);
        }

        if tx_json.get("Fee").is_none() {
            let fee = self.request("fee", json!({})).await?;
            let open_ledger_fee = fee
                .get("drops")
                .and_then(|d| value_as_u64(d.get("open_ledger_fee")))
                .unwrap_or(BASE_FEE_DROPS);
            tx_json["Fee"] = json!(open_ledger_fee.max(BASE_FEE_DROPS).to_string());
        }

        if tx_json.get("LastLedgerSequence").is_none() {
            let current = self.request("ledger_current", json!({})).await?;
            let index = value_as_u64(current.get("ledger_current_index")).ok_or_else(|| {
                Error::InvalidData("ledger_current has no ledger_current_index".to_string())
            })?;
            tx_json["LastLedgerSequence"] = json!(index + self.options.last_ledger_offset);
        }

        Ok(tx_json)
    }

    #[instrument(skip(self, tx_blob))]
    async fn submit_signed(&self, tx_blob: &str) -> Result<SubmitOutcome> {
        let result = self.request("submit", json!({ "tx_blob": tx_blob })).await?;

        let engine_result = result
            .get("engine_result")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let hash = result
            .get("tx_json")
            .and_then(|t| t.get("hash"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidData("submit response has no hash".to_string()))?;

        debug!("submitted {}: preliminary {}", hash, engine_result);

        if TERMINAL_PREFIXES.iter().any(|p| engine_result.starts_with(p)) {
            warn!("transaction {} rejected before consensus: {}", hash, engine_result);
            return Ok(SubmitOutcome {
                result_code: engine_result,
                hash,
                fee_drops: None,
                validated: false,
                affected_nodes: Vec::new(),
            });
        }

        self.wait_for_validation(&hash).await
    }

    #[instrument(skip(self))]
    async fn latest_validated_ledgers(&self, depth: u32) -> Result<Vec<LedgerClose>> {
        let latest = self.fetch_ledger(json!("validated")).await?;
        let latest_index = latest.ledger_index;
        let mut closes = vec![latest];

        for offset in 1..depth as u64 {
            let Some(index) = latest_index.checked_sub(offset) else {
                break;
            };
            match self.fetch_ledger(json!(index)).await {
                Ok(close) => closes.push(close),
                Err(e) => {
                    debug!("skipping ledger {}: {}", index, e);
                    continue;
                }
            }
        }

        Ok(closes)
    }
}

/// Build a snapshot from an `amm_info` result, orienting the pair so the
/// native side is the XRP reserve
fn parse_pool_snapshot(amm: &Value, token: &TokenIdentity) -> Option<PoolSnapshot> {
    let first = amm.get("amount").and_then(Amount::from_json)?;
    let second = amm.get("amount2").and_then(Amount::from_json)?;

    let (xrp, issued) = match (first, second) {
        (Amount::Native(drops), Amount::Issued(issued))
        | (Amount::Issued(issued), Amount::Native(drops)) => (Xrp::from_drops_str(&drops)?, issued),
        _ => return None,
    };

    let lp_token = amm
        .get("lp_token")
        .and_then(|v| serde_json::from_value::<IssuedAmount>(v.clone()).ok());

    Some(PoolSnapshot {
        token: token.clone(),
        xrp_reserve: xrp.as_f64(),
        token_reserve: issued.value,
        pool_account: amm.get("account").and_then(Value::as_str)?.to_string(),
        lp_token,
    })
}

fn value_as_u64(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pool_snapshot() {
        let token = TokenIdentity::new("534F4C4F00000000000000000000000000000000", "rIssuer");
        let amm = json!({
            "account": "rPoolAccount",
            "amount": "100000000",
            "amount2": {
                "currency": "534F4C4F00000000000000000000000000000000",
                "issuer": "rIssuer",
                "value": "5000"
            },
            "lp_token": {
                "currency": "03930D02208264E2E40EC1B0C09E4DB96EE197B1",
                "issuer": "rPoolAccount",
                "value": "707106.78"
            }
        });

        let snapshot = parse_pool_snapshot(&amm, &token).unwrap();
        assert_eq!(snapshot.xrp_reserve, 100.0);
        assert_eq!(snapshot.token_reserve, "5000");
        assert_eq!(snapshot.pool_account, "rPoolAccount");
        assert_eq!(snapshot.tokens_per_xrp(), Some(50.0));
        assert!(snapshot.lp_token.is_some());
    }

    #[test]
    fn test_parse_pool_snapshot_swapped_sides() {
        let token = TokenIdentity::new("USD", "rIssuer");
        let amm = json!({
            "account": "rPool",
            "amount": { "currency": "USD", "issuer": "rIssuer", "value": "10" },
            "amount2": "2000000"
        });
        let snapshot = parse_pool_snapshot(&amm, &token).unwrap();
        assert_eq!(snapshot.xrp_reserve, 2.0);
        assert_eq!(snapshot.token_reserve, "10");
    }

    #[test]
    fn test_parse_pool_snapshot_rejects_token_pairs() {
        let token = TokenIdentity::new("USD", "rIssuer");
        let amm = json!({
            "account": "rPool",
            "amount": { "currency": "EUR", "issuer": "rOther", "value": "10" },
            "amount2": { "currency": "USD", "issuer": "rIssuer", "value": "10" }
        });
        assert!(parse_pool_snapshot(&amm, &token).is_none());
    }

    #[test]
    fn test_value_as_u64() {
        assert_eq!(value_as_u64(Some(&json!(7))), Some(7));
        assert_eq!(value_as_u64(Some(&json!("90000001"))), Some(90000001));
        assert_eq!(value_as_u64(Some(&json!("x"))), None);
        assert_eq!(value_as_u64(None), None);
    }

    #[test]
    fn test_client_trims_url() {
        let client = XrplClient::new("https://s1.ripple.com:51234/").unwrap();
        assert_eq!(client.url(), "https://s1.ripple.com:51234");
    }
}
