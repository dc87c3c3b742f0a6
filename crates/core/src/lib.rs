//! XRPL Trader Core - Shared data models, types, errors and the currency codec

pub mod currency;
pub mod errors;
pub mod models;
pub mod types;

pub use errors::{Error, Result};
pub use models::*;
pub use types::*;
