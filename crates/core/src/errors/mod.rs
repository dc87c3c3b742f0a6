//! Error types and Result alias for the XRPL trader

use thiserror::Error;

/// Main error type for the XRPL trader
#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Ledger RPC error {code}: {message}")]
    RpcError { code: String, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Already running: {0}")]
    AlreadyRunning(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// True when the ledger reported that the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::RpcError { code, .. } => {
                matches!(code.as_str(), "actNotFound" | "entryNotFound" | "txnNotFound")
            }
            _ => false,
        }
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
