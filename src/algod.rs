//! Ledger node access
//!
//! [`Ledger`] is the node surface the client depends on. [`AlgodClient`]
//! implements it over the algod REST API; read-only evaluation
//! ([`Ledger::simulate`]) and submission ([`Ledger::submit`]) are separate
//! capabilities with different failure semantics.

use crate::config::NetworkConfig;
use crate::transaction::{encode_simulate_request, SignedTransaction, SuggestedParams};
use crate::types::Address;
use eyre::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

const API_TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Account balance fields (`GET /v2/accounts/{address}`)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub address: String,
    /// Balance in µAlgo
    pub amount: u64,
    /// Balance the account must keep
    #[serde(rename = "min-balance", default)]
    pub min_balance: u64,
    #[serde(default)]
    pub round: u64,
}

impl AccountInfo {
    /// Spendable balance: total minus the locked minimum balance
    pub fn available(&self) -> u64 {
        self.amount.saturating_sub(self.min_balance)
    }
}

/// Outcome of a simulated group
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulateResponse {
    #[serde(rename = "txn-groups", default)]
    pub txn_groups: Vec<SimulatedGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulatedGroup {
    #[serde(rename = "failure-message", default)]
    pub failure_message: Option<String>,
    #[serde(rename = "txn-results", default)]
    pub txn_results: Vec<SimulatedTxnResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulatedTxnResult {
    #[serde(rename = "txn-result")]
    pub txn_result: PendingTransaction,
}

impl SimulateResponse {
    /// Failure message of the (single) simulated group, if any
    pub fn failure(&self) -> Option<&str> {
        self.txn_groups
            .first()
            .and_then(|g| g.failure_message.as_deref())
            .filter(|m| !m.is_empty())
    }

    /// Logs of the transaction at `index` in the first group
    pub fn logs(&self, index: usize) -> &[Vec<u8>] {
        self.txn_groups
            .first()
            .and_then(|g| g.txn_results.get(index))
            .map(|r| r.txn_result.logs.as_slice())
            .unwrap_or(&[])
    }
}

/// Pending or confirmed transaction (`GET /v2/transactions/pending/{txid}`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingTransaction {
    #[serde(rename = "confirmed-round", default)]
    pub confirmed_round: Option<u64>,
    #[serde(rename = "pool-error", default)]
    pub pool_error: String,
    #[serde(default, with = "base64_list")]
    pub logs: Vec<Vec<u8>>,
}

impl PendingTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round.is_some_and(|r| r > 0)
    }
}

/// Node status (`GET /v2/status`)
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    #[serde(rename = "last-round")]
    pub last_round: u64,
}

/// Application info (`GET /v2/applications/{id}`)
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationInfo {
    pub id: u64,
    pub params: ApplicationParams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationParams {
    #[serde(default)]
    pub creator: String,
    #[serde(rename = "global-state", default)]
    pub global_state: Vec<TealKeyValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TealKeyValue {
    #[serde(with = "base64_bytes")]
    pub key: Vec<u8>,
    pub value: TealValue,
}

/// `type` 1 is bytes, 2 is uint
#[derive(Debug, Clone, Deserialize)]
pub struct TealValue {
    #[serde(rename = "type")]
    pub value_type: u8,
    #[serde(default, with = "base64_bytes")]
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub uint: u64,
}

impl ApplicationParams {
    /// Uint value stored under `key` in global state
    pub fn global_uint(&self, key: &str) -> Option<u64> {
        self.global_state
            .iter()
            .find(|kv| kv.key == key.as_bytes())
            .filter(|kv| kv.value.value_type == 2)
            .map(|kv| kv.value.uint)
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

/// Ledger node operations used by the client
pub trait Ledger: Send + Sync {
    /// Parameters for building new transactions
    fn suggested_params(&self) -> impl Future<Output = Result<SuggestedParams>> + Send;

    /// Balance information for an account
    fn account_info(&self, address: &Address) -> impl Future<Output = Result<AccountInfo>> + Send;

    /// Evaluate a group against current state without committing it
    fn simulate(
        &self,
        txns: &[SignedTransaction],
    ) -> impl Future<Output = Result<SimulateResponse>> + Send;

    /// Submit a signed group, returning the id of its first transaction
    fn submit(&self, txns: &[SignedTransaction]) -> impl Future<Output = Result<String>> + Send;

    fn pending_transaction(
        &self,
        tx_id: &str,
    ) -> impl Future<Output = Result<PendingTransaction>> + Send;

    fn status(&self) -> impl Future<Output = Result<NodeStatus>> + Send;

    /// Block until the round after `round` is available
    fn wait_for_block_after(&self, round: u64) -> impl Future<Output = Result<NodeStatus>> + Send;

    fn application(&self, app_id: u64) -> impl Future<Output = Result<ApplicationInfo>> + Send;
}

/// algod REST client
#[derive(Debug, Clone)]
pub struct AlgodClient {
    url: String,
    token: String,
    client: Client,
}

impl AlgodClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("IjarahRustSDK/0.1.0")
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::new(config.algod_url.clone(), config.algod_token.clone())
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            builder
        } else {
            builder.header(API_TOKEN_HEADER, &self.token)
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(self.client.get(format!("{}{}", self.url, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(self.client.post(format!("{}{}", self.url, path)))
    }
}

/// Turn a non-success response into an error carrying the node's message
async fn check(resp: Response, what: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    eyre::bail!("Failed to {}: {} - {}", what, status, message)
}

impl Ledger for AlgodClient {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let resp = self
            .get("/v2/transactions/params")
            .send()
            .await
            .context("Failed to fetch transaction params")?;
        check(resp, "fetch transaction params")
            .await?
            .json()
            .await
            .context("Failed to parse transaction params")
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo> {
        let resp = self
            .get(&format!("/v2/accounts/{}?exclude=all", address))
            .send()
            .await
            .context("Failed to fetch account")?;
        check(resp, "fetch account")
            .await?
            .json()
            .await
            .context("Failed to parse account")
    }

    async fn simulate(&self, txns: &[SignedTransaction]) -> Result<SimulateResponse> {
        let body = encode_simulate_request(txns)?;
        let resp = self
            .post("/v2/transactions/simulate?format=json")
            .header("Content-Type", "application/msgpack")
            .body(body)
            .send()
            .await
            .context("Failed to simulate transaction")?;
        check(resp, "simulate transaction")
            .await?
            .json()
            .await
            .context("Failed to parse simulate response")
    }

    async fn submit(&self, txns: &[SignedTransaction]) -> Result<String> {
        let mut body = Vec::new();
        for txn in txns {
            body.extend_from_slice(&txn.encode()?);
        }

        let resp = self
            .post("/v2/transactions")
            .header("Content-Type", "application/x-binary")
            .body(body)
            .send()
            .await
            .context("Failed to submit transaction")?;
        let result: SubmitResponse = check(resp, "submit transaction")
            .await?
            .json()
            .await
            .context("Failed to parse submit response")?;

        tracing::info!("Submitted transaction group: {}", result.tx_id);
        Ok(result.tx_id)
    }

    async fn pending_transaction(&self, tx_id: &str) -> Result<PendingTransaction> {
        let resp = self
            .get(&format!("/v2/transactions/pending/{}", tx_id))
            .send()
            .await
            .context("Failed to fetch pending transaction")?;
        check(resp, "fetch pending transaction")
            .await?
            .json()
            .await
            .context("Failed to parse pending transaction")
    }

    async fn status(&self) -> Result<NodeStatus> {
        let resp = self
            .get("/v2/status")
            .send()
            .await
            .context("Failed to fetch node status")?;
        check(resp, "fetch node status")
            .await?
            .json()
            .await
            .context("Failed to parse node status")
    }

    async fn wait_for_block_after(&self, round: u64) -> Result<NodeStatus> {
        let resp = self
            .get(&format!("/v2/status/wait-for-block-after/{}", round))
            .send()
            .await
            .context("Failed to wait for block")?;
        check(resp, "wait for block")
            .await?
            .json()
            .await
            .context("Failed to parse node status")
    }

    async fn application(&self, app_id: u64) -> Result<ApplicationInfo> {
        let resp = self
            .get(&format!("/v2/applications/{}", app_id))
            .send()
            .await
            .context("Failed to fetch application")?;
        check(resp, "fetch application")
            .await?
            .json()
            .await
            .context("Failed to parse application")
    }
}

/// Serde helper for base64 byte fields
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64.decode(text).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for lists of base64 byte strings
pub(crate) mod base64_list {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let items = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        items
            .into_iter()
            .map(|s| BASE64.decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
