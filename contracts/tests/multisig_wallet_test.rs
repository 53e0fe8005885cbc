//! Integration tests for the multisig wallet contract.
//!
//! These tests walk the full approval lifecycle against a real in-memory
//! ledger: a four-signer vault with a quorum of three, funded with 10 000
//! units of a token, the same shape as a typical treasury deployment.
//! Also covers execution failures at the ledger boundary and the
//! exactly-once guarantee under repeated approvals.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use quorum_contracts::multisig_wallet::{
    ApprovalOutcome, MultisigWallet, TransactionStatus, WalletError,
};
use quorum_contracts::signer_registry::SignerRegistry;
use quorum_protocol::identity::Address;
use quorum_protocol::vault::{AssetId, AssetLedger, InMemoryLedger, TransferError};

const QUORUM: usize = 3;
const FUNDED: u64 = 10_000;

fn s(i: usize) -> Address {
    Address::derive(&format!("owner-{i}"))
}

fn non_owner() -> Address {
    Address::derive("non-owner")
}

fn vault_account() -> Address {
    Address::derive("vault")
}

fn token() -> AssetId {
    AssetId::derive("MTK")
}

fn r() -> Address {
    Address::derive("recipient")
}

/// Helper: four owners, quorum three, vault funded with `FUNDED` tokens.
fn funded_wallet() -> MultisigWallet<InMemoryLedger> {
    let registry = SignerRegistry::new(QUORUM, vec![s(1), s(2), s(3), s(4)]).unwrap();
    let ledger = InMemoryLedger::new();
    ledger.deposit(vault_account(), token(), FUNDED).unwrap();
    MultisigWallet::new(vault_account(), registry, ledger)
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

#[test]
fn deployment_sets_quorum_and_signers() {
    let wallet = funded_wallet();

    assert_eq!(wallet.quorum(), QUORUM);
    assert_eq!(wallet.signer_count(), 4);
    for i in 1..=4 {
        assert!(wallet.is_valid_signer(&s(i)));
    }
    assert!(!wallet.is_valid_signer(&non_owner()));
    assert_eq!(wallet.transaction_count(), 0);
    assert_eq!(wallet.custodial_balance(&token()), FUNDED);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn full_approval_lifecycle() {
    let wallet = funded_wallet();

    // A. S1 submits: one approval, not enough.
    let receipt = wallet.transfer(s(1), 100, r(), token()).unwrap();
    assert_eq!(receipt.tx_id, 0);
    let tx = wallet.transaction(0).unwrap();
    assert_eq!(tx.approval_count(), 1);
    assert!(tx.has_approved(&s(1)));
    assert!(!tx.completed);

    // B. S2 approves: two of three.
    let receipt = wallet.approve(s(2), 0).unwrap();
    assert_eq!(
        receipt.outcome,
        ApprovalOutcome::Pending {
            approvals: 2,
            quorum: 3
        }
    );
    assert!(!wallet.transaction(0).unwrap().completed);
    assert_eq!(wallet.custodial_balance(&token()), FUNDED);

    // C. S3 approves: quorum met, funds move.
    let receipt = wallet.approve(s(3), 0).unwrap();
    assert!(receipt.executed());
    let tx = wallet.transaction(0).unwrap();
    assert!(tx.completed);
    assert_eq!(tx.status(), TransactionStatus::Completed);
    assert_eq!(tx.approval_count(), 3);
    assert_eq!(wallet.custodial_balance(&token()), FUNDED - 100);
    assert_eq!(wallet.ledger().balance_of(&r(), &token()), 100);

    // D. S4 is too late.
    assert_eq!(wallet.approve(s(4), 0), Err(WalletError::AlreadyCompleted(0)));
    let tx = wallet.transaction(0).unwrap();
    assert_eq!(tx.approval_count(), 3);
    assert!(!tx.has_approved(&s(4)));
    assert_eq!(wallet.ledger().balance_of(&r(), &token()), 100);
}

#[test]
fn non_signer_cannot_submit() {
    let wallet = funded_wallet();

    // E.
    assert_eq!(
        wallet.transfer(non_owner(), 100, r(), token()),
        Err(WalletError::UnauthorizedSigner(non_owner()))
    );
    assert_eq!(wallet.transaction_count(), 0);
}

#[test]
fn non_signer_cannot_approve() {
    let wallet = funded_wallet();
    wallet.transfer(s(1), 100, r(), token()).unwrap();

    assert_eq!(
        wallet.approve(non_owner(), 0),
        Err(WalletError::UnauthorizedSigner(non_owner()))
    );
    assert_eq!(wallet.transaction(0).unwrap().approval_count(), 1);
}

#[test]
fn transfer_above_balance_is_rejected() {
    let wallet = funded_wallet();

    // F.
    let err = wallet.transfer(s(1), 9_000_000, r(), token()).unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { .. }));
    assert_eq!(wallet.transaction_count(), 0);
}

#[test]
fn every_signer_can_submit() {
    let wallet = funded_wallet();
    for i in 1..=4 {
        let receipt = wallet.transfer(s(i), 10, r(), token()).unwrap();
        assert_eq!(receipt.tx_id, (i - 1) as u64);
    }
    assert_eq!(wallet.transaction_count(), 4);
}

#[test]
fn zero_amount_rejected_for_every_signer() {
    let wallet = funded_wallet();
    for i in 1..=4 {
        assert_eq!(
            wallet.transfer(s(i), 0, r(), token()),
            Err(WalletError::ZeroAmount)
        );
    }
    assert_eq!(wallet.transaction_count(), 0);
}

#[test]
fn null_recipient_and_asset_rejected() {
    let wallet = funded_wallet();
    assert_eq!(
        wallet.transfer(s(1), 100, Address::ZERO, token()),
        Err(WalletError::InvalidRecipient)
    );
    assert_eq!(
        wallet.transfer(s(1), 100, s(1), AssetId::ZERO),
        Err(WalletError::InvalidAsset)
    );
    assert_eq!(wallet.transaction_count(), 0);
}

#[test]
fn unknown_transaction_rejected() {
    let wallet = funded_wallet();
    assert_eq!(
        wallet.approve(s(1), 7),
        Err(WalletError::TransactionNotFound(7))
    );
    assert_eq!(
        wallet.transaction(0),
        Err(WalletError::TransactionNotFound(0))
    );
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn ids_increase_from_zero_regardless_of_outcome() {
    let wallet = funded_wallet();

    let first = wallet.transfer(s(1), 10, r(), token()).unwrap().tx_id;
    // A rejected submission does not consume an id.
    assert!(wallet.transfer(s(1), 0, r(), token()).is_err());
    let second = wallet.transfer(s(2), 10, r(), token()).unwrap().tx_id;
    wallet.approve(s(2), first).unwrap();
    wallet.approve(s(3), first).unwrap();
    let third = wallet.transfer(s(3), 10, r(), token()).unwrap().tx_id;

    assert_eq!((first, second, third), (0, 1, 2));
    let ids: Vec<u64> = wallet.transactions().iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn approvals_never_exceed_signer_count() {
    let wallet = funded_wallet();
    wallet.transfer(s(1), 10, r(), token()).unwrap();

    for round in 0..3 {
        for i in 1..=4 {
            let _ = wallet.approve(s(i), 0);
        }
        let tx = wallet.transaction(0).unwrap();
        assert!(tx.approval_count() <= wallet.signer_count(), "round {round}");
    }
    assert_eq!(wallet.transaction(0).unwrap().approval_count(), QUORUM);
}

#[test]
fn repeated_approvals_after_completion_execute_once() {
    let wallet = funded_wallet();
    wallet.transfer(s(1), 250, r(), token()).unwrap();
    wallet.approve(s(2), 0).unwrap();
    wallet.approve(s(3), 0).unwrap();

    for i in 1..=4 {
        assert_eq!(wallet.approve(s(i), 0), Err(WalletError::AlreadyCompleted(0)));
    }
    assert_eq!(wallet.ledger().balance_of(&r(), &token()), 250);
    assert_eq!(wallet.custodial_balance(&token()), FUNDED - 250);
}

#[test]
fn balance_is_checked_at_submission_only() {
    let wallet = funded_wallet();

    // Two requests that each fit the balance but not together.
    wallet.transfer(s(1), 6_000, r(), token()).unwrap();
    wallet.transfer(s(2), 6_000, r(), token()).unwrap();
    assert_eq!(wallet.transaction_count(), 2);

    wallet.approve(s(2), 0).unwrap();
    assert!(wallet.approve(s(3), 0).unwrap().executed());

    // Second one can no longer execute: the last approval fails as a unit.
    wallet.approve(s(1), 1).unwrap();
    let err = wallet.approve(s(3), 1).unwrap_err();
    assert!(matches!(err, WalletError::TransferFailed { tx_id: 1, .. }));

    let tx = wallet.transaction(1).unwrap();
    assert!(!tx.completed);
    assert_eq!(tx.approval_count(), 2);
    assert!(!tx.has_approved(&s(3)));

    // Top the vault back up and the same signer retries.
    wallet
        .ledger()
        .deposit(vault_account(), token(), 2_000)
        .unwrap();
    assert!(wallet.approve(s(3), 1).unwrap().executed());
    assert_eq!(wallet.ledger().balance_of(&r(), &token()), 12_000);
    assert_eq!(wallet.custodial_balance(&token()), 0);
}

// ---------------------------------------------------------------------------
// Ledger failures
// ---------------------------------------------------------------------------

/// A ledger that reports plenty of funds but can be told to refuse
/// transfers, and counts the transfers it actually performed.
#[derive(Default)]
struct FlakyLedger {
    refuse: AtomicBool,
    executed: AtomicUsize,
}

impl AssetLedger for FlakyLedger {
    fn balance_of(&self, _account: &Address, _asset: &AssetId) -> u64 {
        u64::MAX
    }

    fn transfer(
        &self,
        _from: &Address,
        _to: &Address,
        _asset: &AssetId,
        _amount: u64,
    ) -> Result<(), TransferError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected("asset paused".into()));
        }
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn failed_execution_on_submission_creates_nothing() {
    let registry = SignerRegistry::new(1, vec![s(1), s(2)]).unwrap();
    let wallet = MultisigWallet::new(vault_account(), registry, FlakyLedger::default());
    wallet.ledger().refuse.store(true, Ordering::SeqCst);

    let err = wallet.transfer(s(1), 5, r(), token()).unwrap_err();
    assert_eq!(
        err,
        WalletError::TransferFailed {
            tx_id: 0,
            source: TransferError::Rejected("asset paused".into())
        }
    );
    assert_eq!(wallet.transaction_count(), 0);

    // Id 0 is still free.
    wallet.ledger().refuse.store(false, Ordering::SeqCst);
    assert_eq!(wallet.transfer(s(1), 5, r(), token()).unwrap().tx_id, 0);
    assert_eq!(wallet.ledger().executed.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_execution_keeps_transaction_retryable() {
    let registry = SignerRegistry::new(2, vec![s(1), s(2), s(3)]).unwrap();
    let wallet = MultisigWallet::new(vault_account(), registry, FlakyLedger::default());

    wallet.transfer(s(1), 5, r(), token()).unwrap();
    wallet.ledger().refuse.store(true, Ordering::SeqCst);
    assert!(matches!(
        wallet.approve(s(2), 0),
        Err(WalletError::TransferFailed { .. })
    ));
    assert_eq!(wallet.transaction(0).unwrap().approval_count(), 1);

    wallet.ledger().refuse.store(false, Ordering::SeqCst);
    assert!(wallet.approve(s(3), 0).unwrap().executed());
    assert_eq!(wallet.ledger().executed.load(Ordering::SeqCst), 1);

    // s(2)'s failed vote never counted, but the transaction is done now.
    assert_eq!(wallet.approve(s(2), 0), Err(WalletError::AlreadyCompleted(0)));
    assert_eq!(wallet.ledger().executed.load(Ordering::SeqCst), 1);
}
