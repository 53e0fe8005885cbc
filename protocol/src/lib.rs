// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quorum Protocol Core Library
//!
//! Shared primitives for the Quorum multi-signer vault: who can act
//! (identities), what can move (assets), and the boundary across which value
//! actually moves (the asset ledger).
//!
//! ## Architecture
//!
//! - **config**: Protocol constants. Every magic number lives here.
//! - **identity**: 20-byte addresses and the null identity.
//! - **vault**: Asset ids, balance bookkeeping, and the [`vault::AssetLedger`]
//!   collaborator trait with an in-memory implementation.
//!
//! The approval state machine itself lives in the `quorum-contracts` crate;
//! this crate knows nothing about signers or quorums.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over cleverness.
//! 2. Every public API is documented.
//! 3. If it touches money, it has tests. Plural.

pub mod config;
pub mod identity;
pub mod vault;
