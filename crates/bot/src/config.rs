//! Process configuration from the environment (and `.env`)

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use xrpl_trader_core::currency::to_ledger_format;
use xrpl_trader_core::{Error, Result, TokenIdentity};
use xrpl_trader_networking::http::DEFAULT_RPC_URL;

/// Settings shared by every user session in this process
#[derive(Clone)]
pub struct AppConfig {
    pub rpc_url: String,
    /// SQLite database file
    pub data_file: PathBuf,
    /// Default minimum pool liquidity (XRP) for new users
    pub min_liquidity: f64,
    /// Hard cap on a single snipe (XRP)
    pub max_snipe_amount: f64,
    /// Default slippage tolerance (percent) for new users
    pub default_slippage: f64,
    pub sniper_check_interval: Duration,
    pub max_tokens_per_scan: usize,
    pub copy_trading_check_interval: Duration,
    pub max_transactions_to_check: u32,
    pub wallet_seed: String,
    pub wallet_address: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("rpc_url", &self.rpc_url)
            .field("data_file", &self.data_file)
            .field("min_liquidity", &self.min_liquidity)
            .field("max_snipe_amount", &self.max_snipe_amount)
            .field("default_slippage", &self.default_slippage)
            .field("sniper_check_interval", &self.sniper_check_interval)
            .field("max_tokens_per_scan", &self.max_tokens_per_scan)
            .field("copy_trading_check_interval", &self.copy_trading_check_interval)
            .field("max_transactions_to_check", &self.max_transactions_to_check)
            .field("wallet_address", &self.wallet_address)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| Error::ConfigError(format!("{} must be set", key)))
        };

        Ok(Self {
            rpc_url: var("XRPL_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            data_file: PathBuf::from(var("DATA_FILE").unwrap_or_else(|| "./data/state.db".to_string())),
            min_liquidity: parse_or(&var, "MIN_LIQUIDITY", 100.0)?,
            max_snipe_amount: parse_or(&var, "MAX_SNIPE_AMOUNT", 5000.0)?,
            default_slippage: parse_or(&var, "DEFAULT_SLIPPAGE", 4.0)?,
            sniper_check_interval: Duration::from_millis(parse_or(&var, "SNIPER_CHECK_INTERVAL_MS", 8000)?),
            max_tokens_per_scan: parse_or(&var, "MAX_TOKENS_PER_SCAN", 15)?,
            copy_trading_check_interval: Duration::from_millis(parse_or(
                &var,
                "COPY_TRADING_CHECK_INTERVAL_MS",
                3000,
            )?),
            max_transactions_to_check: parse_or(&var, "MAX_TRANSACTIONS_TO_CHECK", 20)?,
            wallet_seed: required("WALLET_SEED")?,
            wallet_address: required("WALLET_ADDRESS")?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::ConfigError(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}

/// Parse a `SYMBOL:ISSUER` command-line token, converting long symbols to
/// their hex currency code
pub fn parse_token_arg(raw: &str) -> Result<TokenIdentity> {
    let (symbol, issuer) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidData(format!("expected CURRENCY:ISSUER, got {:?}", raw)))?;
    let (symbol, issuer) = (symbol.trim(), issuer.trim());
    if symbol.is_empty() || !issuer.starts_with('r') {
        return Err(Error::InvalidData(format!("invalid token {:?}", raw)));
    }
    Ok(TokenIdentity::new(to_ledger_format(symbol), issuer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WALLET_SEED", "sEdSecret"),
            ("WALLET_ADDRESS", "rWallet"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.min_liquidity, 100.0);
        assert_eq!(config.max_snipe_amount, 5000.0);
        assert_eq!(config.default_slippage, 4.0);
        assert_eq!(config.sniper_check_interval, Duration::from_millis(8000));
        assert_eq!(config.max_tokens_per_scan, 15);
        assert_eq!(config.copy_trading_check_interval, Duration::from_millis(3000));
        assert_eq!(config.max_transactions_to_check, 20);
        assert!(!format!("{:?}", config).contains("sEdSecret"));
    }

    #[test]
    fn test_wallet_required() {
        let err = AppConfig::from_lookup(lookup(&[("WALLET_ADDRESS", "rWallet")])).unwrap_err();
        assert!(err.to_string().contains("WALLET_SEED"));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("WALLET_SEED", "s"),
            ("WALLET_ADDRESS", "r"),
            ("MAX_TOKENS_PER_SCAN", "many"),
        ]));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_parse_token_arg() {
        let token = parse_token_arg("SOLO:rsoLo2S1kiGeCcn6hCUXVrCpGMWLrRrLZz").unwrap();
        assert_eq!(token.currency, "534F4C4F00000000000000000000000000000000");
        assert_eq!(token.issuer, "rsoLo2S1kiGeCcn6hCUXVrCpGMWLrRrLZz");

        assert_eq!(parse_token_arg("USD:rIssuer").unwrap().currency, "USD");
        assert!(parse_token_arg("SOLO").is_err());
        assert!(parse_token_arg(":rIssuer").is_err());
        assert!(parse_token_arg("SOLO:xIssuer").is_err());
    }
}
