//! Transaction signing
//!
//! Key handling lives outside this crate. The engine only needs something
//! that knows the wallet address and can turn a filled-in transaction into
//! a signed blob.

use crate::XrplClient;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use xrpl_trader_core::{Error, Result};

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Classic address of the signing wallet
    fn address(&self) -> &str;

    /// Sign an autofilled transaction and return the hex blob
    async fn sign(&self, tx_json: &Value) -> Result<String>;
}

/// Signs through the `sign` method of a trusted ledger node.
///
/// Only point this at a node you operate: the seed travels with the request.
pub struct ServerSigner {
    client: Arc<XrplClient>,
    address: String,
    seed: String,
}

impl ServerSigner {
    pub fn new(client: Arc<XrplClient>, address: &str, seed: &str) -> Result<Self> {
        if address.is_empty() || !address.starts_with('r') {
            return Err(Error::ConfigError(format!("invalid wallet address: {:?}", address)));
        }
        if seed.is_empty() {
            return Err(Error::ConfigError("wallet seed is empty".to_string()));
        }
        Ok(Self {
            client,
            address: address.to_string(),
            seed: seed.to_string(),
        })
    }
}

impl fmt::Debug for ServerSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSigner")
            .field("address", &self.address)
            .field("node", &self.client.url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionSigner for ServerSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx_json: &Value) -> Result<String> {
        self.client.sign_with_secret(tx_json, &self.seed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_validates_config() {
        let client = Arc::new(XrplClient::new("http://localhost:5005").unwrap());
        assert!(ServerSigner::new(client.clone(), "", "sEd").is_err());
        assert!(ServerSigner::new(client.clone(), "rAddress", "").is_err());

        let signer = ServerSigner::new(client, "rAddress", "sEdSecret").unwrap();
        assert_eq!(signer.address(), "rAddress");
        assert!(!format!("{:?}", signer).contains("sEdSecret"));
    }
}
