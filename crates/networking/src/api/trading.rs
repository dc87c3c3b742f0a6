//! Trading transactions with validation

use serde_json::{json, Value};
use tracing::warn;
use xrpl_trader_core::{format_token_value, Error, Result, TokenIdentity, Xrp};

/// `tfPartialPayment`: deliver anything between `DeliverMin` and `Amount`
pub const TF_PARTIAL_PAYMENT: u32 = 0x0002_0000;

/// Trust-line limit used when opening a line for a token we are about to buy
pub const DEFAULT_TRUST_LIMIT: &str = "100000";

/// Open (or raise) a trust line to `token`
pub fn trust_set_tx(account: &str, token: &TokenIdentity, limit: &str) -> Value {
    json!({
        "TransactionType": "TrustSet",
        "Account": account,
        "LimitAmount": token.to_amount_json(limit),
    })
}

/// Buy `token` through the AMM with a self-directed payment.
///
/// Spends at most `max_xrp` and fails atomically unless at least
/// `min_tokens` are delivered.
pub fn buy_payment_tx(
    account: &str,
    token: &TokenIdentity,
    expected_tokens: f64,
    min_tokens: f64,
    max_xrp: Xrp,
) -> Result<Value> {
    if max_xrp.to_drops() == 0 {
        return Err(Error::InvalidData("XRP amount must be positive".to_string()));
    }
    if !(min_tokens > 0.0 && expected_tokens >= min_tokens) {
        return Err(Error::InvalidData(format!(
            "token bounds out of order: min {} expected {}",
            min_tokens, expected_tokens
        )));
    }

    Ok(json!({
        "TransactionType": "Payment",
        "Account": account,
        "Destination": account,
        "Amount": token.to_amount_json(&format_token_value(expected_tokens)),
        "DeliverMin": token.to_amount_json(&format_token_value(min_tokens)),
        "SendMax": max_xrp.to_drops_string(),
        "Flags": TF_PARTIAL_PAYMENT,
    }))
}

/// Sell `token_amount` of `token` through the AMM with a self-directed payment.
///
/// Fails atomically unless at least `min_xrp` is delivered.
pub fn sell_payment_tx(
    account: &str,
    token: &TokenIdentity,
    token_amount: f64,
    expected_xrp: Xrp,
    min_xrp: Xrp,
) -> Result<Value> {
    if !(token_amount > 0.0) {
        return Err(Error::InvalidData("Token amount must be positive".to_string()));
    }
    if min_xrp.to_drops() == 0 || expected_xrp.to_drops() < min_xrp.to_drops() {
        return Err(Error::InvalidData(format!(
            "XRP bounds out of order: min {} expected {}",
            min_xrp.as_f64(),
            expected_xrp.as_f64()
        )));
    }

    let formatted = format_token_value(token_amount);
    if formatted.parse::<f64>().ok() != Some(token_amount) {
        warn!(
            "Rounded token amount from {} to {} for {}",
            token_amount,
            formatted,
            token.readable_symbol()
        );
    }

    Ok(json!({
        "TransactionType": "Payment",
        "Account": account,
        "Destination": account,
        "Amount": expected_xrp.to_drops_string(),
        "DeliverMin": min_xrp.to_drops_string(),
        "SendMax": token.to_amount_json(&formatted),
        "Flags": TF_PARTIAL_PAYMENT,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TokenIdentity {
        TokenIdentity::new("USD", "rIssuer")
    }

    #[test]
    fn test_buy_payment_bounds() {
        let tx = buy_payment_tx("rMe", &token(), 500.0, 480.0, Xrp(10.0)).unwrap();
        assert_eq!(tx["Destination"], "rMe");
        assert_eq!(tx["SendMax"], "10000000");
        assert_eq!(tx["Amount"]["value"], "500.000000");
        assert_eq!(tx["DeliverMin"]["value"], "480.000000");
        assert_eq!(tx["Flags"], TF_PARTIAL_PAYMENT);
    }

    #[test]
    fn test_buy_payment_rejects_zero_spend() {
        assert!(buy_payment_tx("rMe", &token(), 500.0, 480.0, Xrp(0.0)).is_err());
        assert!(buy_payment_tx("rMe", &token(), 400.0, 480.0, Xrp(1.0)).is_err());
    }

    #[test]
    fn test_sell_payment_bounds() {
        let tx = sell_payment_tx("rMe", &token(), 100.0, Xrp(2.0), Xrp(1.92)).unwrap();
        assert_eq!(tx["Amount"], "2000000");
        assert_eq!(tx["DeliverMin"], "1920000");
        assert_eq!(tx["SendMax"]["value"], "100.000000");
    }

    #[test]
    fn test_trust_set() {
        let tx = trust_set_tx("rMe", &token(), DEFAULT_TRUST_LIMIT);
        assert_eq!(tx["TransactionType"], "TrustSet");
        assert_eq!(tx["LimitAmount"]["issuer"], "rIssuer");
        assert_eq!(tx["LimitAmount"]["value"], "100000");
    }
}
