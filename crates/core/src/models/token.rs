//! Token identity and trust lines

use crate::currency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An issued token: the (currency code, issuer) pair.
///
/// Two tokens are the same token only when both parts match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIdentity {
    /// Ledger currency code (3-char standard code or 40 hex digits)
    pub currency: String,
    /// Issuing account address
    pub issuer: String,
}

impl TokenIdentity {
    pub fn new(currency: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            issuer: issuer.into(),
        }
    }

    /// Human-readable symbol for logs and records
    pub fn readable_symbol(&self) -> String {
        currency::to_readable(&self.currency)
    }

    /// The `{currency, issuer}` object used in `amm_info` and similar requests
    pub fn to_asset_json(&self) -> serde_json::Value {
        serde_json::json!({
            "currency": self.currency,
            "issuer": self.issuer,
        })
    }

    /// An issued amount of this token as a transaction field
    pub fn to_amount_json(&self, value: &str) -> serde_json::Value {
        serde_json::json!({
            "currency": self.currency,
            "issuer": self.issuer,
            "value": value,
        })
    }
}

impl fmt::Display for TokenIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.readable_symbol(), self.issuer)
    }
}

/// A trust line as reported by `account_lines`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustLine {
    /// Counterparty (the issuer, from the holder's point of view)
    pub account: String,
    pub currency: String,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub balance: f64,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    pub limit: f64,
}

impl TrustLine {
    pub fn matches(&self, token: &TokenIdentity) -> bool {
        self.currency == token.currency && self.account == token.issuer
    }
}

/// Find the line for `token` in an `account_lines` result
pub fn find_trust_line<'a>(lines: &'a [TrustLine], token: &TokenIdentity) -> Option<&'a TrustLine> {
    lines.iter().find(|line| line.matches(token))
}

/// Deserialize an f64 that may arrive as a number, string, or null
fn deserialize_f64_lenient<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct F64Lenient;

    impl<'de> de::Visitor<'de> for F64Lenient {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, string, or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<f64, E> {
            v.parse::<f64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(0.0)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(F64Lenient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_both_parts() {
        let a = TokenIdentity::new("SOL", "rIssuerA");
        assert_eq!(a, TokenIdentity::new("SOL", "rIssuerA"));
        assert_ne!(a, TokenIdentity::new("SOL", "rIssuerB"));
        assert_ne!(a, TokenIdentity::new("SOX", "rIssuerA"));
    }

    #[test]
    fn test_trust_line_lenient_numbers() {
        let line: TrustLine = serde_json::from_value(serde_json::json!({
            "account": "rIssuer",
            "currency": "USD",
            "balance": "-12.5",
            "limit": 100
        }))
        .unwrap();
        assert_eq!(line.balance, -12.5);
        assert_eq!(line.limit, 100.0);

        let lines = vec![line];
        assert!(find_trust_line(&lines, &TokenIdentity::new("USD", "rIssuer")).is_some());
        assert!(find_trust_line(&lines, &TokenIdentity::new("USD", "rOther")).is_none());
    }
}
