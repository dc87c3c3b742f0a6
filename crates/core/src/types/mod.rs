//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};

/// Drops per XRP (the ledger's native-asset base unit)
pub const DROPS_PER_XRP: f64 = 1_000_000.0;

/// Seconds between the Unix epoch and the ripple epoch (2000-01-01T00:00:00Z)
pub const RIPPLE_EPOCH_OFFSET: i64 = 946_684_800;

/// Quantities below this are treated as "no movement"
pub const AMOUNT_EPSILON: f64 = 0.000001;

/// Native-asset amount in whole XRP (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Xrp(pub f64);

impl Xrp {
    pub fn new(amount: f64) -> Self {
        Xrp(amount)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Parse a drops string (e.g. `"25000000"`) into XRP
    pub fn from_drops_str(drops: &str) -> Option<Self> {
        let drops = drops.trim().parse::<u64>().ok()?;
        Some(Xrp(drops as f64 / DROPS_PER_XRP))
    }

    /// Whole drops, rounded down so we never authorise more than requested
    pub fn to_drops(&self) -> u64 {
        if !self.0.is_finite() || self.0 <= 0.0 {
            return 0;
        }
        (self.0 * DROPS_PER_XRP).floor() as u64
    }

    /// Drops as the decimal string the ledger expects in transaction fields
    pub fn to_drops_string(&self) -> String {
        self.to_drops().to_string()
    }
}

/// Percentage value (e.g. slippage tolerance)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percent(pub f64);

impl Percent {
    pub fn new(value: f64) -> Self {
        Percent(value)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Multiplier that leaves `100 - self` percent of a quantity
    pub fn remaining_fraction(&self) -> f64 {
        (100.0 - self.0) / 100.0
    }
}

/// Format an issued-currency value for a transaction field (6 decimal places)
pub fn format_token_value(value: f64) -> String {
    format!("{:.6}", value)
}

/// Convert a ripple-epoch timestamp to UTC
pub fn ripple_time_to_utc(ripple_secs: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(ripple_secs + RIPPLE_EPOCH_OFFSET, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_conversion() {
        assert_eq!(Xrp::from_drops_str("25000000"), Some(Xrp(25.0)));
        assert_eq!(Xrp::from_drops_str("not drops"), None);
        assert_eq!(Xrp(10.0).to_drops_string(), "10000000");
        assert_eq!(Xrp(0.0000019).to_drops(), 1);
        assert_eq!(Xrp(-3.0).to_drops(), 0);
        assert_eq!(Xrp(f64::NAN).to_drops(), 0);
    }

    #[test]
    fn test_slippage_fraction() {
        assert!((Percent(4.0).remaining_fraction() - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_ripple_epoch() {
        let t = ripple_time_to_utc(0).unwrap();
        assert_eq!(t.to_rfc3339(), "2000-01-01T00:00:00+00:00");
    }
}
