//! Key management daemon (KMD) signer
//!
//! This signer asks a KMD instance to sign each transaction with a key held
//! in one of its wallets. Keys never leave the daemon; the returned
//! signature is checked against the account's public key before use.

use super::{ensure_sender, TransactionSigner};
use crate::config::KmdConfig;
use crate::error::LeaseError;
use crate::transaction::{SignedTransaction, Transaction};
use crate::types::Address;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use eyre::{eyre, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const KMD_TOKEN_HEADER: &str = "X-KMD-API-Token";

/// KMD wallet signer
pub struct KmdSigner {
    config: KmdConfig,
    /// Wallet id resolved from the wallet name
    wallet_id: String,
    /// Account within the wallet
    address: Address,
    client: Client,
}

// ========== API Request/Response Types ==========

#[derive(Debug, Deserialize)]
struct WalletsResponse {
    #[serde(default)]
    wallets: Vec<WalletInfo>,
}

#[derive(Debug, Deserialize)]
struct WalletInfo {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct InitWalletRequest<'a> {
    wallet_id: &'a str,
    wallet_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitWalletResponse {
    wallet_handle_token: String,
}

#[derive(Debug, Serialize)]
struct HandleRequest<'a> {
    wallet_handle_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListKeysResponse {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SignTransactionRequest<'a> {
    wallet_handle_token: &'a str,
    wallet_password: &'a str,
    transaction: String,
}

#[derive(Debug, Deserialize)]
struct SignTransactionResponse {
    signed_transaction: String,
}

impl KmdSigner {
    /// Create a signer for a specific account in the configured wallet
    pub async fn new(config: KmdConfig, address: Address) -> Result<Self> {
        let client = build_client()?;
        let wallet_id = Self::fetch_wallet_id(&client, &config).await?;

        let signer = Self {
            config,
            wallet_id,
            address,
            client,
        };

        let addresses = signer.list_addresses().await?;
        if !addresses.contains(&address) {
            eyre::bail!(
                "Account {} not found in KMD wallet {}",
                address,
                signer.config.wallet_name
            );
        }
        Ok(signer)
    }

    /// Create a signer for the first account in the configured wallet
    ///
    /// Useful on LocalNet where the default wallet holds pre-funded accounts.
    pub async fn discover(config: KmdConfig) -> Result<Self> {
        let client = build_client()?;
        let wallet_id = Self::fetch_wallet_id(&client, &config).await?;

        let mut signer = Self {
            config,
            wallet_id,
            address: Address::ZERO,
            client,
        };

        let address = signer
            .list_addresses()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| eyre!("KMD wallet {} has no accounts", signer.config.wallet_name))?;
        tracing::info!("Discovered KMD account: {}", address);

        signer.address = address;
        Ok(signer)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.config.url.trim_end_matches('/'), path))
            .header(KMD_TOKEN_HEADER, &self.config.token)
    }

    async fn fetch_wallet_id(client: &Client, config: &KmdConfig) -> Result<String> {
        let url = format!("{}/v1/wallets", config.url.trim_end_matches('/'));
        let resp = client
            .get(&url)
            .header(KMD_TOKEN_HEADER, &config.token)
            .send()
            .await
            .context("Failed to fetch KMD wallets")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            eyre::bail!("Failed to fetch KMD wallets: {} - {}", status, body);
        }

        let wallets: WalletsResponse = resp
            .json()
            .await
            .context("Failed to parse wallets response")?;

        wallets
            .wallets
            .into_iter()
            .find(|w| w.name == config.wallet_name)
            .map(|w| w.id)
            .ok_or_else(|| eyre!("No KMD wallet named {}", config.wallet_name))
    }

    /// Open a wallet handle; handles are short-lived and released after use
    async fn init_handle(&self) -> Result<String> {
        let resp = self
            .post("/v1/wallet/init")
            .json(&InitWalletRequest {
                wallet_id: &self.wallet_id,
                wallet_password: &self.config.wallet_password,
            })
            .send()
            .await
            .context("Failed to open KMD wallet")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LeaseError::WalletRejected(format!("{} - {}", status, body)).into());
        }

        let handle: InitWalletResponse = resp
            .json()
            .await
            .context("Failed to parse wallet handle")?;
        Ok(handle.wallet_handle_token)
    }

    async fn release_handle(&self, handle: &str) {
        let result = self
            .post("/v1/wallet/release")
            .json(&HandleRequest {
                wallet_handle_token: handle,
            })
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!("Failed to release KMD wallet handle: {}", e);
        }
    }

    async fn list_addresses(&self) -> Result<Vec<Address>> {
        let handle = self.init_handle().await?;
        let result = self.list_addresses_with(&handle).await;
        self.release_handle(&handle).await;
        result
    }

    async fn list_addresses_with(&self, handle: &str) -> Result<Vec<Address>> {
        let resp = self
            .post("/v1/key/list")
            .json(&HandleRequest {
                wallet_handle_token: handle,
            })
            .send()
            .await
            .context("Failed to list KMD keys")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            eyre::bail!("Failed to list KMD keys: {} - {}", status, body);
        }

        let keys: ListKeysResponse = resp.json().await.context("Failed to parse key list")?;
        keys.addresses.iter().map(|a| a.parse()).collect()
    }

    async fn sign_one(&self, handle: &str, txn: &Transaction) -> Result<SignedTransaction> {
        ensure_sender(&self.address, txn)?;

        let resp = self
            .post("/v1/transaction/sign")
            .json(&SignTransactionRequest {
                wallet_handle_token: handle,
                wallet_password: &self.config.wallet_password,
                transaction: BASE64.encode(txn.encode()?),
            })
            .send()
            .await
            .context("Failed to request KMD signature")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LeaseError::WalletRejected(format!("{} - {}", status, body)).into());
        }

        let signed: SignTransactionResponse = resp
            .json()
            .await
            .context("Failed to parse signed transaction")?;
        let raw = BASE64
            .decode(&signed.signed_transaction)
            .context("Invalid signed transaction encoding")?;

        let sig = extract_signature(&raw)?;
        verify_signature(&self.address, txn, &sig)?;

        Ok(SignedTransaction::new(txn.clone(), sig))
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")
}

impl TransactionSigner for KmdSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_group(&self, txns: &[Transaction]) -> Result<Vec<SignedTransaction>> {
        let handle = self.init_handle().await?;

        let mut signed = Vec::with_capacity(txns.len());
        let mut failure = None;
        for txn in txns {
            match self.sign_one(&handle, txn).await {
                Ok(s) => signed.push(s),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.release_handle(&handle).await;

        match failure {
            Some(e) => Err(e),
            None => {
                tracing::debug!("KMD signed {} transaction(s)", signed.len());
                Ok(signed)
            }
        }
    }
}

/// Signed transaction as KMD returns it; the `txn` body is ignored
#[derive(Debug, Deserialize)]
struct SignedTxnEnvelope {
    #[serde(default)]
    sig: Option<serde_bytes::ByteBuf>,
}

/// Pull the signature out of a signed transaction
fn extract_signature(raw: &[u8]) -> Result<[u8; 64]> {
    let envelope: SignedTxnEnvelope = rmp_serde::from_slice(raw)
        .map_err(|e| eyre!("Invalid signed transaction: {}", e))?;
    let sig = envelope
        .sig
        .ok_or_else(|| eyre!("Signed transaction has no signature"))?;

    sig.as_slice()
        .try_into()
        .map_err(|_| eyre!("Invalid signature length: {}", sig.len()))
}

fn verify_signature(address: &Address, txn: &Transaction, sig: &[u8; 64]) -> Result<()> {
    let key = VerifyingKey::from_bytes(address.as_bytes()).context("Invalid account public key")?;
    key.verify(&txn.bytes_to_sign()?, &Signature::from_bytes(sig))
        .map_err(|e| eyre!("KMD returned a signature that does not verify: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalSigner;
    use crate::transaction::tests::params;

    #[tokio::test]
    async fn test_extract_and_verify_signature() {
        let local = LocalSigner::from_seed([3u8; 32]);
        let txn = Transaction::payment(&params(), local.address(), Address([2; 32]), 7).unwrap();
        let signed = local.sign_group(&[txn.clone()]).await.unwrap().remove(0);

        let raw = signed.encode().unwrap();
        let sig = extract_signature(&raw).unwrap();
        assert_eq!(Some(sig), signed.sig);
        assert!(verify_signature(&local.address(), &txn, &sig).is_ok());

        let other = Transaction::payment(&params(), local.address(), Address([2; 32]), 8).unwrap();
        assert!(verify_signature(&local.address(), &other, &sig).is_err());
    }

    #[test]
    fn test_extract_requires_signature() {
        let txn = Transaction::payment(&params(), Address([1; 32]), Address([2; 32]), 7).unwrap();
        let raw = SignedTransaction::unsigned(txn).encode().unwrap();
        assert!(extract_signature(&raw).is_err());
    }

    #[test]
    fn test_extract_rejects_short_signature() {
        // {"sig": bin(3), "txn": {}}
        let raw = [0x82, 0xa3, b's', b'i', b'g', 0xc4, 3, 1, 2, 3, 0xa3, b't', b'x', b'n', 0x80];
        let err = extract_signature(&raw).unwrap_err();
        assert!(err.to_string().contains("length"));
        assert!(extract_signature(b"\x01").is_err());
    }
}
