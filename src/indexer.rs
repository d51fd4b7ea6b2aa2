//! Indexer client for recent network transactions

use crate::config::NetworkConfig;
use crate::constants::micro_to_algo;
use eyre::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const INDEXER_TOKEN_HEADER: &str = "X-Indexer-API-Token";

/// Rows the dashboard lists
pub const DEFAULT_TRANSACTION_LIMIT: usize = 10;

/// A network transaction as the dashboard shows it
#[derive(Debug, Clone, PartialEq)]
pub struct RecentTransaction {
    pub id: String,
    /// `pay`, `axfer`, `appl`, ...
    pub tx_type: String,
    /// Transferred amount in display units; zero for non-transfers
    pub amount: f64,
    pub sender: String,
    pub receiver: Option<String>,
    /// Unix seconds of the confirming block
    pub round_time: Option<u64>,
}

impl RecentTransaction {
    pub fn is_payment(&self) -> bool {
        self.tx_type == "pay"
    }
}

impl From<IndexerTransaction> for RecentTransaction {
    fn from(tx: IndexerTransaction) -> Self {
        let (amount, receiver) = match (tx.payment, tx.asset_transfer) {
            (Some(pay), _) => (pay.amount, Some(pay.receiver)),
            (None, Some(axfer)) => (axfer.amount, Some(axfer.receiver)),
            (None, None) => (0, None),
        };

        Self {
            id: tx.id,
            tx_type: tx.tx_type,
            amount: micro_to_algo(amount),
            sender: tx.sender,
            receiver,
            round_time: tx.round_time,
        }
    }
}

/// Sum of the listed amounts
pub fn total_amount(txns: &[RecentTransaction]) -> f64 {
    txns.iter().map(|t| t.amount).sum()
}

// ========== Indexer Response Types ==========

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<IndexerTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct IndexerTransaction {
    id: String,
    #[serde(rename = "tx-type")]
    tx_type: String,
    sender: String,
    #[serde(rename = "round-time", default)]
    round_time: Option<u64>,
    #[serde(rename = "payment-transaction", default)]
    payment: Option<TransferFields>,
    #[serde(rename = "asset-transfer-transaction", default)]
    asset_transfer: Option<TransferFields>,
}

#[derive(Debug, Deserialize)]
struct TransferFields {
    #[serde(default)]
    amount: u64,
    #[serde(default)]
    receiver: String,
}

/// Indexer REST client
#[derive(Debug, Clone)]
pub struct IndexerClient {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl IndexerClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
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
        Self::new(config.indexer_url.clone(), config.indexer_token.clone())
    }

    /// Latest `limit` transactions on the network
    pub async fn recent_transactions(&self, limit: usize) -> Result<Vec<RecentTransaction>> {
        let mut request = self
            .client
            .get(format!("{}/v2/transactions", self.url))
            .query(&[("limit", limit)]);
        if !self.token.is_empty() {
            request = request.header(INDEXER_TOKEN_HEADER, &self.token);
        }

        let response = request
            .send()
            .await
            .context("Failed to query indexer")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            eyre::bail!("Failed to query indexer: {} - {}", status, body);
        }

        let result: TransactionsResponse = response
            .json()
            .await
            .context("Failed to parse indexer response")?;

        tracing::debug!("Indexer returned {} transactions", result.transactions.len());
        Ok(result
            .transactions
            .into_iter()
            .map(RecentTransaction::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_indexer_rows() {
        let json = r#"{
            "current-round": 100,
            "transactions": [
                {
                    "id": "PAY1",
                    "tx-type": "pay",
                    "sender": "SENDER",
                    "round-time": 1700000000,
                    "payment-transaction": {"amount": 2500000, "receiver": "RCV"}
                },
                {
                    "id": "AX1",
                    "tx-type": "axfer",
                    "sender": "SENDER",
                    "asset-transfer-transaction": {"amount": 1000000, "receiver": "RCV2", "asset-id": 31566704}
                },
                {
                    "id": "APP1",
                    "tx-type": "appl",
                    "sender": "SENDER",
                    "application-transaction": {"application-id": 1}
                }
            ]
        }"#;
        let resp: TransactionsResponse = serde_json::from_str(json).unwrap();
        let rows: Vec<RecentTransaction> =
            resp.transactions.into_iter().map(Into::into).collect();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_payment());
        assert_eq!(rows[0].amount, 2.5);
        assert_eq!(rows[0].receiver.as_deref(), Some("RCV"));
        assert_eq!(rows[0].round_time, Some(1_700_000_000));
        assert_eq!(rows[1].amount, 1.0);
        assert_eq!(rows[2].amount, 0.0);
        assert_eq!(rows[2].receiver, None);
        assert_eq!(total_amount(&rows), 3.5);
    }
}
