//! Lease types for user-facing API

use crate::constants::{format_algo, parse_algo, MIN_LEASE_DEPOSIT};
use crate::error::LeaseError;
use eyre::Result;

/// Lease record held by the contract for one lessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseInfo {
    /// Leased principal in µAlgo
    pub principal: u64,
    /// Accrued, unclaimed ujrah in µAlgo
    pub ujrah: u64,
    /// Seconds since the lease started
    pub duration: u64,
}

impl LeaseInfo {
    /// Build from the `(principal, ujrah, duration)` tuple; all zeros means no lease
    pub fn from_tuple(principal: u64, ujrah: u64, duration: u64) -> Option<Self> {
        if principal == 0 && ujrah == 0 && duration == 0 {
            return None;
        }
        Some(Self {
            principal,
            ujrah,
            duration,
        })
    }

    /// Principal plus ujrah, what a full termination pays out
    pub fn payout(&self) -> u64 {
        self.principal.saturating_add(self.ujrah)
    }
}

/// Lease summary for an arbitrary lessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessorInfo {
    pub principal: u64,
    pub ujrah: u64,
}

impl LessorInfo {
    pub fn from_tuple(principal: u64, ujrah: u64) -> Option<Self> {
        if principal == 0 && ujrah == 0 {
            return None;
        }
        Some(Self { principal, ujrah })
    }
}

/// Accrual parameters stored in the application's global state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContractParams {
    pub annual_ujrah_rate_bp: Option<u64>,
    pub seconds_per_year: Option<u64>,
}

/// Parameters for starting or topping up a lease
#[derive(Debug, Clone, Copy)]
pub struct DepositParams {
    /// Amount in µAlgo
    pub amount: u64,
}

impl DepositParams {
    pub fn new(amount: u64) -> Self {
        Self { amount }
    }

    /// Parse an ALGO amount such as `"2.5"`
    pub fn from_algo(amount: &str) -> Result<Self> {
        Ok(Self::new(parse_algo(amount)?))
    }

    /// Check the fixed minimum; balance is checked by the client against the node
    pub fn validate(&self) -> Result<(), LeaseError> {
        if self.amount < MIN_LEASE_DEPOSIT {
            return Err(LeaseError::BelowMinimumDeposit {
                amount: self.amount,
                minimum: MIN_LEASE_DEPOSIT,
            });
        }
        Ok(())
    }
}

/// Parameters for terminating a lease, partially or fully
#[derive(Debug, Clone, Copy)]
pub struct WithdrawParams {
    /// Amount in µAlgo; `None` withdraws the whole principal
    pub amount: Option<u64>,
}

impl WithdrawParams {
    pub fn partial(amount: u64) -> Self {
        Self {
            amount: Some(amount),
        }
    }

    pub fn full() -> Self {
        Self { amount: None }
    }

    pub fn validate(&self) -> Result<(), LeaseError> {
        if self.amount == Some(0) {
            return Err(LeaseError::InvalidAmount);
        }
        Ok(())
    }

    /// Resolve against the current lease
    pub fn resolve(&self, lease: &LeaseInfo) -> Result<u64, LeaseError> {
        let amount = self.amount.unwrap_or(lease.principal);
        if amount == 0 {
            return Err(LeaseError::InvalidAmount);
        }
        if amount > lease.principal {
            return Err(LeaseError::ExceedsPrincipal {
                requested: amount,
                principal: lease.principal,
            });
        }
        Ok(amount)
    }
}

impl std::fmt::Display for LeaseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "principal {} ALGO, ujrah {} ALGO",
            format_algo(self.principal),
            format_algo(self.ujrah)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tuple_is_no_lease() {
        assert_eq!(LeaseInfo::from_tuple(0, 0, 0), None);
        assert_eq!(LessorInfo::from_tuple(0, 0), None);
        assert!(LeaseInfo::from_tuple(1_000_000, 0, 5).is_some());
    }

    #[test]
    fn test_deposit_below_minimum() {
        let err = DepositParams::new(500_000).validate().unwrap_err();
        assert_eq!(
            err,
            LeaseError::BelowMinimumDeposit {
                amount: 500_000,
                minimum: 1_000_000
            }
        );
        assert!(DepositParams::new(1_000_000).validate().is_ok());
        assert_eq!(DepositParams::from_algo("2").unwrap().amount, 2_000_000);
    }

    #[test]
    fn test_withdraw_resolve() {
        let lease = LeaseInfo {
            principal: 3_000_000,
            ujrah: 10,
            duration: 60,
        };
        assert_eq!(WithdrawParams::full().resolve(&lease).unwrap(), 3_000_000);
        assert_eq!(lease.payout(), 3_000_010);
        assert_eq!(LeaseInfo { ujrah: u64::MAX, ..lease }.payout(), u64::MAX);
        assert_eq!(WithdrawParams::partial(1_000_000).resolve(&lease).unwrap(), 1_000_000);
        assert_eq!(
            WithdrawParams::partial(3_000_001).resolve(&lease).unwrap_err(),
            LeaseError::ExceedsPrincipal {
                requested: 3_000_001,
                principal: 3_000_000
            }
        );
        assert_eq!(
            WithdrawParams::partial(0).validate().unwrap_err(),
            LeaseError::InvalidAmount
        );
    }
}
