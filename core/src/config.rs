//! Client configuration.

use serde::{Deserialize, Serialize};

/// Default factomd JSON-RPC endpoint.
pub const DEFAULT_FACTOMD_URL: &str = "http://localhost:8088/v2";
/// Default factom-walletd JSON-RPC endpoint.
pub const DEFAULT_WALLETD_URL: &str = "http://localhost:8089/v2";

/// Endpoints of the remote daemons.
///
/// Missing fields fall back to the local defaults, so a partial JSON or TOML
/// document is enough to override one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full node JSON-RPC endpoint.
    pub factomd_url: String,
    /// Wallet daemon JSON-RPC endpoint.
    pub walletd_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            factomd_url: DEFAULT_FACTOMD_URL.to_string(),
            walletd_url: DEFAULT_WALLETD_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at the given endpoints.
    pub fn new(factomd_url: impl Into<String>, walletd_url: impl Into<String>) -> Self {
        Self {
            factomd_url: factomd_url.into(),
            walletd_url: walletd_url.into(),
        }
    }
}
