//! Transaction builders for the operations the engine submits
//!
//! These produce unsigned `tx_json` objects; `LedgerGateway::autofill` and a
//! `TransactionSigner` turn them into a submittable blob.

mod trading;

pub use trading::*;
