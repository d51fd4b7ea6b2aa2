//! Contract bindings for the Tawf Sharia application

pub mod abi;
pub mod ijarah;

pub use abi::*;
pub use ijarah::*;
