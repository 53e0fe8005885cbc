//! # Identity Module
//!
//! Identities in Quorum are plain 20-byte addresses. Who is allowed to act
//! as an address is decided by the host's authentication layer; the vault
//! only ever sees an already-authenticated [`Address`] and trusts it.
//!
//! The all-zero address is the *null identity*. It is never a valid signer,
//! recipient, or custodial account, and every entry point that accepts an
//! identity rejects it.

pub mod address;

pub use address::{Address, AddressError};
