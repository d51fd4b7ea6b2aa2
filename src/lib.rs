//! Ijarah SDK for Rust
//!
//! A Rust client for the Tawf Sharia Ijarah leasing contract on Algorand.
//!
//! # Features
//!
//! - Start or top up a lease (grouped payment + application call)
//! - Claim accrued ujrah
//! - Terminate a lease, partially or in full
//! - Read lease, lessor and contract balances through simulation
//! - Dashboard feeds: ALGO price history and recent network transactions
//!
//! # Example
//!
//! ```rust,ignore
//! use ijarah_sdk::{DepositParams, IjarahClient, LocalSigner, NetworkConfig};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let signer = LocalSigner::from_secret(std::env::var("LESSOR_SEED")?)?;
//!     let client = IjarahClient::with_signer(signer, config)?;
//!
//!     // Lease 2 ALGO and check the result against the ledger
//!     let receipt = client.deposit(DepositParams::from_algo("2")?).await?;
//!     println!("Confirmed in round {}", receipt.confirmed_round);
//!     println!("{}", client.reconcile().await?);
//!
//!     Ok(())
//! }
//! ```

pub mod algod;
pub mod client;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod indexer;
pub mod price;
pub mod signer;
pub mod state;
pub mod transaction;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use algod::{AlgodClient, Ledger};
pub use client::{CallReceipt, IjarahClient};
pub use config::{KmdConfig, Network, NetworkConfig};
pub use dashboard::{price_snapshots, transaction_snapshots};
pub use error::{eyre, lease_error, Context, ErrorCategory, LeaseError, Report, Result};
pub use indexer::{IndexerClient, RecentTransaction};
pub use price::{PriceFeed, PriceHistory, PricePoint};
pub use signer::{KmdSigner, LocalSigner, TransactionSigner};
pub use state::{AccountState, DisplayState};
pub use types::{
    Address, ContractParams, DepositParams, LeaseInfo, LessorInfo, WithdrawParams,
};
pub use wallet::WalletSession;
