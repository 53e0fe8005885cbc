//! # Balance Bookkeeping
//!
//! A [`BalanceSheet`] tracks how much of each asset every account holds.
//! It is the bookkeeping core behind [`InMemoryLedger`](super::ledger::InMemoryLedger)
//! and enforces two invariants on every operation: a balance never goes
//! negative, and a balance never wraps past `u64::MAX`.
//!
//! A `BalanceSheet` is not `Sync` by itself. Thread safety is the ledger's
//! job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::asset::AssetId;
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during balance operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    /// Attempted to debit more than the available balance.
    #[error(
        "insufficient balance: {account} holds {available} of {asset}, requested {requested}"
    )]
    InsufficientBalance {
        /// The account being debited.
        account: Address,
        /// The asset being debited.
        asset: AssetId,
        /// The current balance.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// The credit would push the balance past `u64::MAX`. The balance is
    /// left unchanged.
    #[error("balance overflow: {account} holds {current} of {asset}, credit {credit}")]
    Overflow {
        /// The account being credited.
        account: Address,
        /// The asset being credited.
        asset: AssetId,
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// BalanceSheet
// ---------------------------------------------------------------------------

/// Per-account, per-asset balances in smallest units.
///
/// Accounts that have never been credited simply have no entry and read as
/// zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// `account -> (asset -> amount)`.
    balances: HashMap<Address, HashMap<AssetId, u64>>,
}

impl BalanceSheet {
    /// Creates an empty balance sheet.
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Returns the balance of `asset` held by `account` (zero if unknown).
    pub fn balance_of(&self, account: &Address, asset: &AssetId) -> u64 {
        self.balances
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    /// Credits (adds) funds, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the credit would exceed `u64::MAX`.
    /// The sheet is unchanged on error.
    pub fn credit(
        &mut self,
        account: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<u64, BalanceError> {
        let current = self.balance_of(&account, &asset);
        let new_amount = current.checked_add(amount).ok_or(BalanceError::Overflow {
            account,
            asset,
            current,
            credit: amount,
        })?;

        self.balances
            .entry(account)
            .or_default()
            .insert(asset, new_amount);
        Ok(new_amount)
    }

    /// Debits (subtracts) funds, returning the remaining balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InsufficientBalance`] if the debit exceeds the
    /// current balance. The sheet is unchanged on error.
    pub fn debit(
        &mut self,
        account: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<u64, BalanceError> {
        let available = self.balance_of(&account, &asset);
        if available < amount {
            return Err(BalanceError::InsufficientBalance {
                account,
                asset,
                available,
                requested: amount,
            });
        }

        let remaining = available - amount;
        self.balances
            .entry(account)
            .or_default()
            .insert(asset, remaining);
        Ok(remaining)
    }

    /// Moves `amount` of `asset` from one account to another.
    ///
    /// All-or-nothing: both the debit and the credit are checked before
    /// either is applied. A transfer to self is a checked no-op.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<(), BalanceError> {
        let available = self.balance_of(&from, &asset);
        if available < amount {
            return Err(BalanceError::InsufficientBalance {
                account: from,
                asset,
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let current = self.balance_of(&to, &asset);
        if current.checked_add(amount).is_none() {
            return Err(BalanceError::Overflow {
                account: to,
                asset,
                current,
                credit: amount,
            });
        }

        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)?;
        Ok(())
    }

    /// Returns all non-zero balances of `account` as `(asset, amount)` pairs.
    pub fn holdings(&self, account: &Address) -> Vec<(AssetId, u64)> {
        let mut holdings: Vec<(AssetId, u64)> = self
            .balances
            .get(account)
            .map(|assets| {
                assets
                    .iter()
                    .filter(|(_, amount)| **amount > 0)
                    .map(|(asset, amount)| (*asset, *amount))
                    .collect()
            })
            .unwrap_or_default();
        holdings.sort_by_key(|(asset, _)| *asset);
        holdings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
