//! XRPL Trader Engine - Trade detection, snipe evaluation, copy sizing and swap execution

pub mod classifier;
pub mod discovery;
pub mod executor;
pub mod risk;
pub mod strategies;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classifier::{detect_trade, TradeClassifier, TradeHashCache};
pub use discovery::discover_new_pools;
pub use executor::{ExecutorOptions, SwapExecutor};
pub use strategies::{
    check_trader_transactions, compute_copy_amount, copy_sell_amount, evaluate_snipe_candidate,
    ObservedTrade, SnipePolicy,
};
