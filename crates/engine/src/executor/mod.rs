//! Swap execution

mod swap;

pub use swap::{ExecutorOptions, SwapExecutor, DEFAULT_SLIPPAGE_PERCENT};
