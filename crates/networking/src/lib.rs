//! XRPL Trader Networking - Ledger gateway, JSON-RPC client and signing

pub mod api;
pub mod gateway;
pub mod http;
pub mod signing;

pub use gateway::LedgerGateway;
pub use http::XrplClient;
pub use signing::{ServerSigner, TransactionSigner};
