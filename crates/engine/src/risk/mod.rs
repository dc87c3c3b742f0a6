//! Risk limits and controls

mod limits;

pub use limits::{check_trade_allowed, RiskLimits, RiskViolation, FEE_RESERVE_XRP};
