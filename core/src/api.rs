//! JSON-RPC client for factomd and factom-walletd.
//!
//! This module provides the request/response envelope, the acknowledgement
//! types and an HTTP client for the remote daemons. It holds no wallet state.

mod client;
mod types;

pub use client::RpcClient;
pub use types::*;
