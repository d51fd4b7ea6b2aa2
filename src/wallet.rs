//! Wallet session: which signer is connected, if any

use crate::error::LeaseError;
use crate::signer::TransactionSigner;
use crate::types::Address;

/// The active wallet connection
///
/// Created empty at start-up; `connect` binds a signer, `disconnect` drops
/// it. Operations that need an account borrow it through [`WalletSession::signer`].
pub struct WalletSession<S: TransactionSigner> {
    signer: Option<S>,
}

impl<S: TransactionSigner> Default for WalletSession<S> {
    fn default() -> Self {
        Self { signer: None }
    }
}

impl<S: TransactionSigner> WalletSession<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(signer: S) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    /// Bind a signer, replacing any previous one
    pub fn connect(&mut self, signer: S) -> Address {
        let address = signer.address();
        if let Some(previous) = self.signer.replace(signer) {
            tracing::info!("Switched wallet from {} to {}", previous.address(), address);
        } else {
            tracing::info!("Connected wallet {}", address);
        }
        address
    }

    /// Drop the active signer; returns it so callers can reuse it
    pub fn disconnect(&mut self) -> Option<S> {
        let previous = self.signer.take();
        if let Some(signer) = &previous {
            tracing::info!("Disconnected wallet {}", signer.address());
        }
        previous
    }

    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    pub fn active_address(&self) -> Option<Address> {
        self.signer.as_ref().map(TransactionSigner::address)
    }

    /// The connected signer, or a "connect wallet" error
    pub fn signer(&self) -> Result<&S, LeaseError> {
        self.signer.as_ref().ok_or(LeaseError::WalletNotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalSigner;

    #[test]
    fn test_session_lifecycle() {
        let mut session: WalletSession<LocalSigner> = WalletSession::new();
        assert!(!session.is_connected());
        assert_eq!(session.signer().err(), Some(LeaseError::WalletNotConnected));

        let address = session.connect(LocalSigner::from_seed([1u8; 32]));
        assert_eq!(session.active_address(), Some(address));

        let other = session.connect(LocalSigner::from_seed([2u8; 32]));
        assert_ne!(address, other);
        assert_eq!(session.active_address(), Some(other));

        let dropped = session.disconnect().unwrap();
        assert_eq!(dropped.address(), other);
        assert!(session.active_address().is_none());
        assert!(session.disconnect().is_none());
    }
}
