//! # Quorum Contracts
//!
//! The authorization logic of the Quorum vault: a custodial account that
//! pays out only when a quorum of designated signers agrees.
//!
//! - **Signer Registry**: the fixed signer set and quorum threshold.
//! - **Multisig Wallet**: the transaction ledger and approval engine:
//!   submission, per-signer approvals, quorum detection, and exactly-once
//!   execution against an [`AssetLedger`](quorum_protocol::vault::AssetLedger).
//!
//! ## Design Principles
//!
//! 1. Validate everything before touching state. A rejected call leaves the
//!    wallet exactly as it found it.
//! 2. Quorum check, transfer, and completion are one critical section.
//!    That is what keeps a transfer from running twice.
//! 3. Every rejection has its own error variant with a stable code.
//! 4. Every public type is serializable (serde) for the API layer.

pub mod multisig_wallet;
pub mod signer_registry;

pub use multisig_wallet::{
    ApprovalOutcome, MultisigWallet, Receipt, Transaction, TransactionStatus, TxId, WalletError,
};
pub use signer_registry::{RegistryError, SignerRegistry};
