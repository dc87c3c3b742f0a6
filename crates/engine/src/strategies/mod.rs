//! Trading strategies: snipe evaluation and copy trading

mod mirror;
mod sniper;

pub use mirror::{
    check_trader_transactions, compute_copy_amount, copy_sell_amount, ObservedTrade,
    MAX_TRADE_AGE_SECS,
};
pub use sniper::{evaluate_snipe_candidate, SnipePolicy, CREATOR_HISTORY_LIMIT, LP_LOCK_THRESHOLD};
