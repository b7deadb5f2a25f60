//! JSON-RPC ledger client over HTTP.
//!
//! Every request is a POST of `{"action": ..., <params>}` to the node URL;
//! the node answers with either `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use aegis_types::{AccountAddress, NetworkId, TxHash};

use crate::client::{CommittedTransaction, ExecutionStatus, LedgerClient, PendingTransaction};
use crate::error::{LedgerError, RejectionReason};
use crate::transaction::SignedTransaction;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct RpcLedgerClient {
    http: reqwest::Client,
    node_url: String,
    network: NetworkId,
    poll_interval: Duration,
}

impl RpcLedgerClient {
    /// Create a client targeting `node_url` (e.g. `https://fullnode.devnet.example:8080`).
    pub fn new(node_url: impl Into<String>, network: NetworkId) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
            network,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    async fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let body = request_body(action, params)?;

        let response = self
            .http
            .post(&self.node_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("invalid JSON response: {e}")))?;

        unwrap_result(json)
    }

    async fn transaction_status(&self, hash: &TxHash) -> Result<TransactionStatusResult, LedgerError> {
        let result = self
            .rpc_call("transaction_status", serde_json::json!({ "hash": hash.to_string() }))
            .await?;
        decode(result, "transaction_status")
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn sequence_number(&self, account: &AccountAddress) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call("account_sequence", serde_json::json!({ "account": account.to_string() }))
            .await?;
        let resp: AccountSequenceResult = decode(result, "account_sequence")?;
        parse_u64(&resp.sequence_number, "sequence_number")
    }

    async fn balance(&self, account: &AccountAddress) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call("account_balance", serde_json::json!({ "account": account.to_string() }))
            .await?;
        let resp: AccountBalanceResult = decode(result, "account_balance")?;
        parse_u64(&resp.balance, "balance")
    }

    async fn submit(&self, txn: &SignedTransaction) -> Result<PendingTransaction, LedgerError> {
        let hash = txn.hash()?;
        let encoded = serde_json::to_value(txn).map_err(|e| LedgerError::Encoding(e.to_string()))?;
        let result = self
            .rpc_call("submit_transaction", serde_json::json!({ "transaction": encoded }))
            .await?;
        let resp: SubmitResult = decode(result, "submit_transaction")?;

        match resp {
            SubmitResult::Accepted { hash: node_hash } => {
                check_accepted_hash(&hash, &node_hash)?;
                Ok(PendingTransaction {
                    hash,
                    sender: txn.raw.sender,
                    sequence_number: txn.raw.sequence_number,
                })
            }
            SubmitResult::Rejected { reason } => Err(LedgerError::Rejected { hash, reason }),
        }
    }

    async fn wait_for_transaction(
        &self,
        pending: &PendingTransaction,
    ) -> Result<CommittedTransaction, LedgerError> {
        loop {
            match self.transaction_status(&pending.hash).await? {
                TransactionStatusResult::Committed { version, execution } => {
                    return Ok(CommittedTransaction {
                        hash: pending.hash,
                        version,
                        status: execution,
                    });
                }
                TransactionStatusResult::Pending => {
                    tracing::trace!(hash = %pending.hash, "transaction still pending");
                }
                TransactionStatusResult::NotFound => {
                    return Err(LedgerError::UnknownTransaction(pending.hash));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fund_account(&self, account: &AccountAddress, amount: u64) -> Result<(), LedgerError> {
        if !self.network.has_faucet() {
            return Err(LedgerError::FaucetUnavailable(self.network));
        }
        self.rpc_call(
            "fund_account",
            serde_json::json!({ "account": account.to_string(), "amount": amount.to_string() }),
        )
        .await?;
        tracing::info!(%account, amount, network = %self.network, "faucet funded account");
        Ok(())
    }
}

fn request_body(action: &str, params: serde_json::Value) -> Result<serde_json::Value, LedgerError> {
    let mut body = params;
    body.as_object_mut()
        .ok_or_else(|| LedgerError::Encoding("params must be a JSON object".into()))?
        .insert("action".to_string(), serde_json::json!(action));
    Ok(body)
}

/// Strip the `result` wrapper, surfacing node-side errors.
fn unwrap_result(json: serde_json::Value) -> Result<serde_json::Value, LedgerError> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(LedgerError::Transport(format!("node error: {err}")));
    }
    Ok(json.get("result").cloned().unwrap_or(json))
}

fn decode<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    action: &str,
) -> Result<T, LedgerError> {
    serde_json::from_value(value)
        .map_err(|e| LedgerError::Transport(format!("invalid {action} response: {e}")))
}

/// The node must acknowledge the hash the client computed.
fn check_accepted_hash(local: &TxHash, node_hash: &str) -> Result<(), LedgerError> {
    match TxHash::from_hex(node_hash) {
        Some(hash) if hash == *local => Ok(()),
        _ => {
            tracing::warn!(local = %local, node = %node_hash, "node reported a different transaction hash");
            Err(LedgerError::Transport(format!(
                "node accepted {local} as {node_hash}"
            )))
        }
    }
}

fn parse_u64(value: &str, field: &str) -> Result<u64, LedgerError> {
    value
        .parse()
        .map_err(|e| LedgerError::Transport(format!("invalid {field} {value:?}: {e}")))
}

// u64 values travel as decimal strings.

#[derive(Debug, Clone, Deserialize)]
struct AccountSequenceResult {
    sequence_number: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AccountBalanceResult {
    balance: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum SubmitResult {
    Accepted { hash: String },
    Rejected { reason: RejectionReason },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum TransactionStatusResult {
    Pending,
    Committed {
        version: u64,
        execution: ExecutionStatus,
    },
    NotFound,
}
