//! XRPL Trader Persistence - SQLite record store for users, purchases and trades

pub mod sqlite;

pub use sqlite::Database;
