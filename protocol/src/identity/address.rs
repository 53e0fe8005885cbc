//! # Addresses
//!
//! A 20-byte account identity, rendered as `0x`-prefixed lowercase hex.
//!
//! Addresses serialize as hex strings rather than byte arrays so they can be
//! used directly as JSON values and as JSON object keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{ADDRESS_HEX_PREFIX, ADDRESS_LENGTH};

/// Domain separator mixed into [`Address::derive`] so derived account
/// addresses never collide with derived asset ids.
const ADDRESS_DERIVATION_DOMAIN: &[u8] = b"quorum:address:";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing an address from text.
#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    /// The input was not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The input decoded to the wrong number of bytes.
    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length in bytes.
        expected: usize,
        /// Length actually decoded.
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null identity.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns `true` for the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Derives a deterministic address from a human-readable label.
    ///
    /// Takes the first 20 bytes of `BLAKE3("quorum:address:" || label)`.
    /// Used for devnet fixtures and tests where real keys don't exist.
    pub fn derive(label: &str) -> Self {
        Self(derive_bytes(ADDRESS_DERIVATION_DOMAIN, label))
    }

    /// Returns the `0x`-prefixed lowercase hex form.
    pub fn to_hex(&self) -> String {
        format!("{}{}", ADDRESS_HEX_PREFIX, hex::encode(self.0))
    }

    /// Parses an address from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        Ok(Self(parse_hex_bytes(s)?))
    }
}

/// Hashes `domain || label` with BLAKE3 and truncates to identity width.
pub(crate) fn derive_bytes(domain: &[u8], label: &str) -> [u8; ADDRESS_LENGTH] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();

    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
    out
}

/// Decodes an optionally `0x`-prefixed hex string into identity bytes.
pub(crate) fn parse_hex_bytes(s: &str) -> Result<[u8; ADDRESS_LENGTH], AddressError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix(ADDRESS_HEX_PREFIX)
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(digits)?;
    if bytes.len() != ADDRESS_LENGTH {
        return Err(AddressError::InvalidLength {
            expected: ADDRESS_LENGTH,
            actual: bytes.len(),
        });
    }

    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&bytes);
    Ok(out)
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &self.to_hex()[..10])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
