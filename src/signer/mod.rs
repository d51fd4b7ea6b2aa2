//! Transaction signer abstraction for the Ijarah SDK
//!
//! This module provides a trait-based abstraction over the wallet that
//! approves transactions, allowing the SDK to work with both an in-process
//! ed25519 key and a key management daemon (KMD) that never reveals keys.

mod kmd;
mod local;

pub use kmd::KmdSigner;
pub use local::LocalSigner;

use crate::error::LeaseError;
use crate::transaction::{SignedTransaction, Transaction};
use crate::types::Address;
use eyre::Result;

/// Trait for signing Algorand transaction groups
///
/// This abstraction allows the SDK to work with different signing mechanisms:
/// - `LocalSigner`: Uses a local ed25519 seed
/// - `KmdSigner`: Uses the KMD REST API (LocalNet wallets)
///
/// A signer that declines to sign must fail with [`LeaseError::WalletRejected`].
pub trait TransactionSigner: Send + Sync {
    /// Returns the address this signer signs for
    fn address(&self) -> Address;

    /// Signs every transaction of a group, in order
    fn sign_group(
        &self,
        txns: &[Transaction],
    ) -> impl std::future::Future<Output = Result<Vec<SignedTransaction>>> + Send;
}

/// Refuse to sign transactions sent from another account
pub(crate) fn ensure_sender(address: &Address, txn: &Transaction) -> Result<(), LeaseError> {
    if txn.sender != *address {
        return Err(LeaseError::WalletRejected(format!(
            "transaction sender {} is not the connected account {}",
            txn.sender, address
        )));
    }
    Ok(())
}
