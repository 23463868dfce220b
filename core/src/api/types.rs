//! API types for the factomd and factom-walletd JSON-RPC interfaces.
//!
//! These types match the daemons' JSON schema and are used for request/response serialization.

use serde::{Deserialize, Serialize};

/// JSON-RPC protocol version sent with every request.
pub const JSON_RPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u32,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, id: u32, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Parameters of `factoid-ack` and `entry-ack`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(
        rename = "fulltransaction",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub full_transaction: Option<String>,
}

/// Processing state of a transaction as reported by factomd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    NotConfirmed,
    TransactionACK,
    DBlockConfirmed,
    #[serde(other)]
    Unknown,
}

/// Status common to Factoid transactions and entry commits/reveals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralTransactionData {
    /// Unix time.
    #[serde(rename = "transactiondate", default)]
    pub transaction_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malleated: Option<Malleated>,
    pub status: AckStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Malleated {
    #[serde(rename = "malleatedtxids")]
    pub malleated_txids: Vec<String>,
}

/// Response of `factoid-ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoidTxStatus {
    pub txid: String,
    #[serde(flatten)]
    pub data: GeneralTransactionData,
}

/// Response of `entry-ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    #[serde(rename = "committxid")]
    pub commit_txid: String,
    #[serde(rename = "entryhash")]
    pub entry_hash: String,
    #[serde(rename = "commitdata")]
    pub commit_data: GeneralTransactionData,
    #[serde(rename = "entrydata")]
    pub entry_data: GeneralTransactionData,
    #[serde(rename = "reserveinfo", default, skip_serializing_if = "Vec::is_empty")]
    pub reserve_transactions: Vec<ReserveInfo>,
    #[serde(
        rename = "conflictingrevealentryhashes",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub conflicting_reveal_entry_hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveInfo {
    pub txid: String,
    /// Unix time.
    pub timeout: i64,
}

/// Parameters naming a transaction under construction in factom-walletd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "tx-name")]
    pub name: String,
}

/// Parameters adding an input, output or fee to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionValueRequest {
    #[serde(rename = "tx-name")]
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub amount: u64,
}

/// Response of the `transactions` wallet call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<TransactionName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionName {
    #[serde(rename = "tx-name")]
    pub name: String,
}
