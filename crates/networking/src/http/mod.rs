//! JSON-RPC transport to a rippled / clio node

mod client;

pub use client::{ClientOptions, XrplClient, DEFAULT_RPC_URL};
