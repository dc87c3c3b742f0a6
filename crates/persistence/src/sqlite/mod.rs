//! SQLite database management

mod connection;
mod copy_traders;
mod purchases;
mod token_lists;
mod transactions;
mod users;

pub use connection::Database;
pub use copy_traders::*;
pub use purchases::*;
pub use token_lists::*;
pub use transactions::*;
pub use users::*;
