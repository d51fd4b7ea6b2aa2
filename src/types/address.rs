//! Algorand account addresses

use data_encoding::BASE32_NOPAD;
use eyre::{ensure, eyre, Context, Result};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

/// Length of the textual address form
pub const ADDRESS_LEN: usize = 58;

const CHECKSUM_LEN: usize = 4;
const APP_ID_PREFIX: &[u8] = b"appID";

/// SHA-512/256, the digest Algorand uses for ids, selectors and checksums
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    Sha512_256::digest(data).into()
}

/// A 32-byte ed25519 public key, displayed as base32 with a 4-byte checksum
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Escrow account of an application
    pub fn for_application(app_id: u64) -> Self {
        let mut data = Vec::with_capacity(APP_ID_PREFIX.len() + 8);
        data.extend_from_slice(APP_ID_PREFIX);
        data.extend_from_slice(&app_id.to_be_bytes());
        Self(sha512_256(&data))
    }

    /// Shortened form for display, e.g. `ABCDEF...WXYZ`
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[ADDRESS_LEN - 4..])
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        ensure!(
            s.len() == ADDRESS_LEN,
            "Invalid address length {} (expected {})",
            s.len(),
            ADDRESS_LEN
        );

        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .with_context(|| format!("Invalid base32 address: {}", s))?;
        ensure!(raw.len() == 32 + CHECKSUM_LEN, "Invalid decoded address length");

        let key: [u8; 32] = raw[..32]
            .try_into()
            .map_err(|_| eyre!("Invalid public key length"))?;
        let address = Address(key);
        ensure!(
            raw[32..] == address.checksum(),
            "Address checksum mismatch: {}",
            s
        );

        Ok(address)
    }
}
