//! Error types for the Factom Client SDK.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Factom Client SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// The storage backend failed (I/O error, lock poisoned, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// The seed chain was used before it was initialized.
    #[error("Wallet seed is not initialized. Open or initialize the wallet first.")]
    NotInitialized,

    /// Initialization finished but the next seed could not be read back.
    #[error("Wallet initialization incomplete: database does not contain the next seed")]
    InitializationIncomplete,

    /// A seed import was attempted on a wallet that already has a different seed.
    #[error("Wallet already initialized with a different seed")]
    AlreadyInitialized,

    /// Key construction rejected the derived material.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Malformed human-readable address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed seed string.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// The wallet was used after `close()`.
    #[error("Wallet is closed")]
    Closed,

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote daemon answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(format!("{:#}", err))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
