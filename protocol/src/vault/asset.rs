//! # Asset Identifiers
//!
//! Every asset a vault can hold (an ERC20-style token, a wrapped coin, a
//! stablecoin) is identified by an [`AssetId`]. Quorum has no separate code
//! path for a native currency: the native coin, if a deployment has one, is
//! just another asset id.
//!
//! `AssetId` shares the 20-byte shape and hex rendering of
//! [`Address`](crate::identity::Address) but is a distinct type, so an asset
//! can never be passed where a recipient is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::identity::address::{derive_bytes, parse_hex_bytes};
use crate::identity::{Address, AddressError};

/// Domain separator for [`AssetId::derive`].
const ASSET_DERIVATION_DOMAIN: &[u8] = b"quorum:asset:";

/// Identity of an asset type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Address);

impl AssetId {
    /// The null asset.
    pub const ZERO: AssetId = AssetId(Address::ZERO);

    /// Uses a contract address as an asset id. This is how ERC20-style
    /// tokens are identified: by the address of their token contract.
    pub const fn from_address(address: Address) -> Self {
        Self(address)
    }

    /// Returns `true` for the null asset.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Derives a deterministic asset id from a symbol or label, e.g. `"USDC"`.
    pub fn derive(label: &str) -> Self {
        Self(Address::from_bytes(derive_bytes(ASSET_DERIVATION_DOMAIN, label)))
    }

    /// Returns the `0x`-prefixed lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parses an asset id from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        Ok(Self(Address::from_bytes(parse_hex_bytes(s)?)))
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({}..)", &self.to_hex()[..10])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AssetId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Address> for AssetId {
    fn from(address: Address) -> Self {
        Self::from_address(address)
    }
}
