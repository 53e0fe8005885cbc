//! # Vault Module: Assets, Balances & the Ledger Boundary
//!
//! Everything the multisig engine needs to know about money, and nothing
//! more. The engine decides *whether* a transfer may happen; the types in
//! here describe *what* is being moved and *who* moves it.
//!
//! ## Architecture
//!
//! ```text
//! asset.rs    : AssetId: identity of a token / asset type
//! balance.rs  : BalanceSheet: checked per-account, per-asset bookkeeping
//! ledger.rs   : AssetLedger trait (the collaborator) + InMemoryLedger
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in smallest-unit denomination.** No floating
//!    point, no decimals in arithmetic.
//!
//! 2. **Overflow is an error, not a wrap.** `checked_add` / `checked_sub`
//!    everywhere.
//!
//! 3. **The ledger is a seam.** The engine depends on the [`AssetLedger`]
//!    trait, never on a concrete store, so production custody can be
//!    plugged in without touching approval logic.

pub mod asset;
pub mod balance;
pub mod ledger;

pub use asset::AssetId;
pub use balance::{BalanceError, BalanceSheet};
pub use ledger::{AssetLedger, InMemoryLedger, TransferError};
