//! Data models for ledger entities, trades and users

mod ledger;
mod pool;
mod token;
mod trade;
mod user;

pub use ledger::*;
pub use pool::*;
pub use token::*;
pub use trade::*;
pub use user::*;
