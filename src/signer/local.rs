//! Local ed25519 key signer

use super::{ensure_sender, TransactionSigner};
use crate::transaction::{SignedTransaction, Transaction};
use crate::types::Address;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use eyre::{eyre, Context, Result};

/// Local signer holding an ed25519 seed in process
///
/// Intended for scripts, LocalNet accounts and tests; interactive wallets
/// should sit behind their own [`TransactionSigner`] implementation.
pub struct LocalSigner {
    signing_key: SigningKey,
    address: Address,
}

impl LocalSigner {
    /// Create from a raw 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = Address(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Create from a hex (optionally `0x`-prefixed) or base64 seed
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_secret(&std::env::var("LESSOR_SEED")?)?;
    /// ```
    pub fn from_secret(secret: impl AsRef<str>) -> Result<Self> {
        let secret = secret.as_ref().trim();
        let stripped = secret.strip_prefix("0x").unwrap_or(secret);

        let bytes = match hex::decode(stripped) {
            Ok(bytes) => bytes,
            Err(_) => BASE64
                .decode(secret)
                .context("Seed is neither hex nor base64")?,
        };

        // A 64-byte secret is seed followed by public key
        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => bytes[..32]
                .try_into()
                .map_err(|_| eyre!("Invalid seed length"))?,
            other => eyre::bail!("Seed must be 32 or 64 bytes, got {}", other),
        };

        Ok(Self::from_seed(seed))
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_group(&self, txns: &[Transaction]) -> Result<Vec<SignedTransaction>> {
        txns.iter()
            .map(|txn| -> Result<SignedTransaction> {
                ensure_sender(&self.address, txn)?;
                let signature = self.signing_key.sign(&txn.bytes_to_sign()?);
                Ok(SignedTransaction::new(txn.clone(), signature.to_bytes()))
            })
            .collect()
    }
}
