//! Error types for the Ijarah SDK
//!
//! Uses `eyre` for ergonomic error handling with context. Failures the caller
//! is expected to branch on are raised as [`LeaseError`] and can be recovered
//! from a [`Report`] with [`ErrorCategory::of`] or `Report::downcast_ref`.

pub use eyre::{eyre, Context, Report, Result};

use crate::constants::format_algo;

/// Domain failures raised by the client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseError {
    #[error("Please connect your wallet to continue")]
    WalletNotConnected,

    #[error("Below minimum deposit: {} ALGO requested, {} ALGO required", format_algo(*.amount), format_algo(*.minimum))]
    BelowMinimumDeposit { amount: u64, minimum: u64 },

    #[error("Insufficient balance: {} ALGO required, {} ALGO available", format_algo(*.required), format_algo(*.available))]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Amount must be greater than 0")]
    InvalidAmount,

    #[error("No active lease found for {0}")]
    NoActiveLease(String),

    #[error("No ujrah available to claim yet")]
    NothingToClaim,

    #[error("Withdrawal of {} ALGO exceeds leased principal of {} ALGO", format_algo(*.requested), format_algo(*.principal))]
    ExceedsPrincipal { requested: u64, principal: u64 },

    #[error("Signature request rejected by wallet: {0}")]
    WalletRejected(String),

    #[error("Transaction {tx_id} rejected by node: {reason}")]
    Rejected { tx_id: String, reason: String },

    #[error("Transaction {tx_id} not confirmed after {rounds} rounds; re-query the lease before retrying")]
    ConfirmationTimeout { tx_id: String, rounds: u64 },

    #[error("Simulation failed: {0}")]
    Simulation(String),
}

/// Coarse classification used by front-ends to pick a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, caught before any network call
    Validation,
    /// The wallet declined to sign
    WalletRejected,
    /// Node unreachable, simulation failure, rejection or timeout
    Network,
}

impl LeaseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LeaseError::WalletNotConnected
            | LeaseError::BelowMinimumDeposit { .. }
            | LeaseError::InsufficientBalance { .. }
            | LeaseError::InvalidAmount
            | LeaseError::NoActiveLease(_)
            | LeaseError::NothingToClaim
            | LeaseError::ExceedsPrincipal { .. } => ErrorCategory::Validation,
            LeaseError::WalletRejected(_) => ErrorCategory::WalletRejected,
            LeaseError::Rejected { .. }
            | LeaseError::ConfirmationTimeout { .. }
            | LeaseError::Simulation(_) => ErrorCategory::Network,
        }
    }
}

impl ErrorCategory {
    /// Classify a report; anything that is not a [`LeaseError`] is a network failure
    pub fn of(report: &Report) -> Self {
        report
            .chain()
            .find_map(|cause| cause.downcast_ref::<LeaseError>())
            .map(LeaseError::category)
            .unwrap_or(ErrorCategory::Network)
    }
}

/// Find the [`LeaseError`] carried anywhere in a report's chain
pub fn lease_error(report: &Report) -> Option<&LeaseError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<LeaseError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_survives_context() {
        let report = Report::new(LeaseError::NothingToClaim).wrap_err("Failed to claim ujrah");
        assert_eq!(ErrorCategory::of(&report), ErrorCategory::Validation);
        assert_eq!(lease_error(&report), Some(&LeaseError::NothingToClaim));
    }

    #[test]
    fn test_unknown_errors_are_network() {
        let report = eyre!("connection refused");
        assert_eq!(ErrorCategory::of(&report), ErrorCategory::Network);
        assert!(lease_error(&report).is_none());
    }

    #[test]
    fn test_minimum_deposit_message() {
        let err = LeaseError::BelowMinimumDeposit {
            amount: 500_000,
            minimum: 1_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("minimum deposit"));
        assert!(msg.contains("0.5"));
    }
}
