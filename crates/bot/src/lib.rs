//! XRPL trading bot: pool sniper and copy trader sessions

pub mod config;
pub mod copy_trader;
pub mod scheduler;
pub mod session;
pub mod sniper;
mod state;

#[cfg(test)]
mod testing;

pub use config::{parse_token_arg, AppConfig};
pub use copy_trader::{run_copy_cycle, spawn_copy_trader, CopyReport};
pub use scheduler::{spawn_polling_loop, LoopHandle};
pub use session::UserSession;
pub use sniper::{run_sniper_cycle, spawn_sniper, SniperReport};
pub use state::AppState;
