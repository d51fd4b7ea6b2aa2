//! Reconciled account state and its display projection

use crate::algod::AccountInfo;
use crate::constants::{format_algo, micro_to_algo};
use crate::types::{Address, LeaseInfo};

/// Ground truth for one account, fetched in a single reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub address: Address,
    /// Wallet balance in µAlgo
    pub balance: u64,
    /// Balance locked by the account's minimum balance requirement
    pub min_balance: u64,
    /// `None` when the account has no active lease
    pub lease: Option<LeaseInfo>,
}

impl AccountState {
    pub fn new(address: Address, account: &AccountInfo, lease: Option<LeaseInfo>) -> Self {
        Self {
            address,
            balance: account.amount,
            min_balance: account.min_balance,
            lease,
        }
    }

    pub fn available(&self) -> u64 {
        self.balance.saturating_sub(self.min_balance)
    }

    pub fn staked(&self) -> u64 {
        self.lease.map(|l| l.principal).unwrap_or(0)
    }

    pub fn unclaimed(&self) -> u64 {
        self.lease.map(|l| l.ujrah).unwrap_or(0)
    }
}

/// Figures a front-end renders, in ALGO
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub address: String,
    pub wallet_balance: f64,
    pub available_balance: f64,
    pub staked_balance: f64,
    pub unclaimed_ujrah: f64,
    /// Seconds since the lease started
    pub lease_duration: Option<u64>,
}

impl From<&AccountState> for DisplayState {
    fn from(state: &AccountState) -> Self {
        Self {
            address: state.address.to_string(),
            wallet_balance: micro_to_algo(state.balance),
            available_balance: micro_to_algo(state.available()),
            staked_balance: micro_to_algo(state.staked()),
            unclaimed_ujrah: micro_to_algo(state.unclaimed()),
            lease_duration: state.lease.map(|l| l.duration),
        }
    }
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Account:   {}", self.address)?;
        writeln!(f, "Balance:   {} ALGO", format_algo(self.balance))?;
        writeln!(f, "Available: {} ALGO", format_algo(self.available()))?;
        match &self.lease {
            Some(lease) => {
                writeln!(f, "Staked:    {} ALGO", format_algo(lease.principal))?;
                write!(f, "Ujrah:     {} ALGO", format_algo(lease.ujrah))
            }
            None => write!(f, "No active lease"),
        }
    }
}
