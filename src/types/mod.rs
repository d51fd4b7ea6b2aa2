//! User-facing types

pub mod address;
pub mod lease;

pub use address::{sha512_256, Address};
pub use lease::{ContractParams, DepositParams, LeaseInfo, LessorInfo, WithdrawParams};
