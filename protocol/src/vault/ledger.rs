//! # Asset Ledger
//!
//! The vault never moves money itself. It asks an [`AssetLedger`] how much
//! the custodial account holds and asks it to move funds once a transfer has
//! enough approvals. In production the ledger is whatever actually custodies
//! the assets (a token contract, a bank core, a chain client); the
//! [`InMemoryLedger`] here backs the devnet node and the test suites.
//!
//! ## Contract
//!
//! - `transfer` is all-or-nothing. If it returns `Err`, no balance moved.
//! - Callers must check the result. A failed transfer is never "probably
//!   fine".
//! - An implementation may call back into the vault from inside
//!   `transfer`. Queries answer; submissions and approvals are rejected
//!   until the transfer returns.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::asset::AssetId;
use super::balance::{BalanceError, BalanceSheet};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons an asset transfer can fail at the ledger boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The bookkeeping layer refused the movement (insufficient funds,
    /// overflow on the receiving side).
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// The ledger refused the transfer for a reason of its own (asset
    /// paused, recipient blocked, upstream unavailable, ...).
    #[error("transfer rejected by ledger: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// The external asset-transfer collaborator consumed by the vault.
pub trait AssetLedger: Send + Sync {
    /// Returns how much of `asset` `account` currently holds.
    fn balance_of(&self, account: &Address, asset: &AssetId) -> u64;

    /// Moves `amount` of `asset` from `from` to `to`.
    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError>;
}

impl<T: AssetLedger + ?Sized> AssetLedger for Arc<T> {
    fn balance_of(&self, account: &Address, asset: &AssetId) -> u64 {
        (**self).balance_of(account, asset)
    }

    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError> {
        (**self).transfer(from, to, asset, amount)
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// A [`BalanceSheet`] behind a `parking_lot::RwLock`.
///
/// Reads take the shared lock, transfers and deposits take the exclusive
/// lock, so a transfer's debit and credit are never observed half-applied.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    sheet: RwLock<BalanceSheet>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            sheet: RwLock::new(BalanceSheet::new()),
        }
    }

    /// Credits `amount` of `asset` to `account` out of thin air.
    ///
    /// This is the funding path: how the custodial account gets a balance in
    /// the first place on devnet and in tests. Returns the new balance.
    pub fn deposit(
        &self,
        account: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<u64, BalanceError> {
        let new_balance = self.sheet.write().credit(account, asset, amount)?;
        tracing::debug!(%account, %asset, amount, new_balance, "deposit credited");
        Ok(new_balance)
    }

    /// Returns all non-zero balances of `account`, ordered by asset id.
    pub fn holdings(&self, account: &Address) -> Vec<(AssetId, u64)> {
        self.sheet.read().holdings(account)
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, account: &Address, asset: &AssetId) -> u64 {
        self.sheet.read().balance_of(account, asset)
    }

    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.sheet.write().transfer(*from, *to, *asset, amount)?;
        tracing::debug!(%from, %to, %asset, amount, "ledger transfer applied");
        Ok(())
    }
}
