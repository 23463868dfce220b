//! HTTP client for the factomd and factom-walletd JSON-RPC APIs.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU32, Ordering};

use super::types::*;

/// JSON-RPC client for both daemons.
///
/// Request ids come from a counter owned by the client, so independent
/// clients never share id state.
#[derive(Debug)]
pub struct RpcClient {
    factomd_url: String,
    walletd_url: String,
    client: reqwest::Client,
    next_id: AtomicU32,
}

impl RpcClient {
    /// Create a new client for the endpoints in `config`.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            factomd_url: config.factomd_url.trim_end_matches('/').to_string(),
            walletd_url: config.walletd_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn factomd_url(&self) -> &str {
        &self.factomd_url
    }

    pub fn walletd_url(&self) -> &str {
        &self.walletd_url
    }

    /// Build the envelope for `method`, taking the next request id.
    pub fn request<P: Serialize>(&self, method: &str, params: Option<&P>) -> Result<JsonRpcRequest> {
        let params = params.map(serde_json::to_value).transpose()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(JsonRpcRequest::new(method, id, params))
    }

    /// Check the processing state of a Factoid transaction.
    pub async fn factoid_ack(&self, txid: &str, full_transaction: &str) -> Result<FactoidTxStatus> {
        let params = ack_request(txid, full_transaction);
        self.factomd_call("factoid-ack", Some(&params)).await
    }

    /// Check the processing state of an entry commit and reveal.
    pub async fn entry_ack(&self, txid: &str, full_transaction: &str) -> Result<EntryStatus> {
        let params = ack_request(txid, full_transaction);
        self.factomd_call("entry-ack", Some(&params)).await
    }

    /// Start a new named transaction in the wallet daemon.
    pub async fn new_transaction(&self, name: &str) -> Result<()> {
        self.wallet_tx_call("new-transaction", name).await
    }

    /// Discard a named transaction.
    pub async fn delete_transaction(&self, name: &str) -> Result<()> {
        self.wallet_tx_call("delete-transaction", name).await
    }

    /// Names of all transactions under construction.
    pub async fn list_transactions(&self) -> Result<Vec<String>> {
        let response: TransactionsResponse = self
            .walletd_call::<_, ()>("transactions", None)
            .await?;
        Ok(response
            .transactions
            .into_iter()
            .map(|tx| tx.name)
            .collect())
    }

    pub async fn add_transaction_input(&self, name: &str, address: &str, amount: u64) -> Result<()> {
        self.wallet_value_call("add-input", name, address, amount)
            .await
    }

    pub async fn add_transaction_output(
        &self,
        name: &str,
        address: &str,
        amount: u64,
    ) -> Result<()> {
        self.wallet_value_call("add-output", name, address, amount)
            .await
    }

    pub async fn add_transaction_ec_output(
        &self,
        name: &str,
        address: &str,
        amount: u64,
    ) -> Result<()> {
        self.wallet_value_call("add-ec-output", name, address, amount)
            .await
    }

    /// Add the transaction fee on top of the input from `address`.
    pub async fn add_transaction_fee(&self, name: &str, address: &str) -> Result<()> {
        self.wallet_value_call("add-fee", name, address, 0).await
    }

    /// Take the transaction fee out of the output to `address`.
    pub async fn sub_transaction_fee(&self, name: &str, address: &str) -> Result<()> {
        self.wallet_value_call("sub-fee", name, address, 0).await
    }

    pub async fn sign_transaction(&self, name: &str) -> Result<()> {
        self.wallet_tx_call("sign-transaction", name).await
    }

    /// Compose a signed transaction into the JSON-RPC call that submits it.
    pub async fn compose_transaction(&self, name: &str) -> Result<serde_json::Value> {
        let params = TransactionRequest {
            name: name.to_string(),
        };
        self.walletd_call("compose-transaction", Some(&params))
            .await
    }

    /// Build and sign a Factoid transfer of `amount` from `from` to `to`.
    ///
    /// Returns the generated transaction name.
    pub async fn send_factoid(&self, from: &str, to: &str, amount: u64) -> Result<String> {
        let name = random_transaction_name()?;
        self.new_transaction(&name).await?;
        self.add_transaction_input(&name, from, amount).await?;
        self.add_transaction_output(&name, to, amount).await?;
        self.add_transaction_fee(&name, from).await?;
        self.sign_transaction(&name).await?;
        log::debug!("Signed factoid transaction {}", name);
        Ok(name)
    }

    /// Build and sign a purchase of entry credits worth `amount` factoshis.
    ///
    /// Returns the generated transaction name.
    pub async fn buy_ec(&self, from: &str, to: &str, amount: u64) -> Result<String> {
        let name = random_transaction_name()?;
        self.new_transaction(&name).await?;
        self.add_transaction_input(&name, from, amount).await?;
        self.add_transaction_ec_output(&name, to, amount).await?;
        self.add_transaction_fee(&name, from).await?;
        self.sign_transaction(&name).await?;
        log::debug!("Signed entry credit purchase {}", name);
        Ok(name)
    }

    // Helper methods

    async fn wallet_tx_call(&self, method: &str, name: &str) -> Result<()> {
        let params = TransactionRequest {
            name: name.to_string(),
        };
        let _: serde_json::Value = self.walletd_call(method, Some(&params)).await?;
        Ok(())
    }

    async fn wallet_value_call(
        &self,
        method: &str,
        name: &str,
        address: &str,
        amount: u64,
    ) -> Result<()> {
        let params = TransactionValueRequest {
            name: name.to_string(),
            address: address.to_string(),
            amount,
        };
        let _: serde_json::Value = self.walletd_call(method, Some(&params)).await?;
        Ok(())
    }

    async fn factomd_call<T: DeserializeOwned, P: Serialize>(
        &self,
        method: &str,
        params: Option<&P>,
    ) -> Result<T> {
        let request = self.request(method, params)?;
        self.post(&self.factomd_url, &request).await
    }

    async fn walletd_call<T: DeserializeOwned, P: Serialize>(
        &self,
        method: &str,
        params: Option<&P>,
    ) -> Result<T> {
        let request = self.request(method, params)?;
        self.post(&self.walletd_url, &request).await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, request: &JsonRpcRequest) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))?;

        log::debug!("{} {} response ({}): {}", url, request.method, status, text);

        // The daemons report JSON-RPC errors with non-2xx codes too, so try
        // the envelope before giving up on the status.
        match decode_response::<T>(&text) {
            Err(Error::Parse(_)) if !status.is_success() => Err(Error::Network(format!(
                "{} failed with HTTP {}",
                request.method, status
            ))),
            other => other,
        }
    }
}

/// Decode a JSON-RPC response body into its result type.
pub(crate) fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let envelope: JsonRpcResponse = serde_json::from_str(text)
        .map_err(|e| Error::Parse(format!("Failed to parse response: {}. Body: {}", e, text)))?;

    if let Some(error) = envelope.error {
        return Err(Error::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = envelope.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(result)
        .map_err(|e| Error::Parse(format!("Failed to parse result: {}. Body: {}", e, text)))
}

fn ack_request(txid: &str, full_transaction: &str) -> AckRequest {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    AckRequest {
        txid: non_empty(txid),
        full_transaction: non_empty(full_transaction),
    }
}

fn random_transaction_name() -> Result<String> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Other(format!("Failed to generate transaction name: {}", e)))?;
    Ok(hex::encode(bytes))
}
