//! Concurrency tests for the multisig wallet.
//!
//! The wallet is shared across threads behind an `Arc`. These tests hammer
//! the same transactions from many threads at once and check that the
//! exactly-once and no-double-count guarantees still hold.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use quorum_contracts::multisig_wallet::{MultisigWallet, WalletError};
use quorum_contracts::signer_registry::SignerRegistry;
use quorum_protocol::identity::Address;
use quorum_protocol::vault::{AssetId, AssetLedger, InMemoryLedger, TransferError};

const SIGNERS: usize = 16;

fn signer(i: usize) -> Address {
    Address::derive(&format!("signer-{i}"))
}

fn all_signers() -> Vec<Address> {
    (0..SIGNERS).map(signer).collect()
}

/// Wraps an [`InMemoryLedger`] and counts successful transfers.
struct CountingLedger {
    inner: InMemoryLedger,
    transfers: AtomicUsize,
}

impl AssetLedger for CountingLedger {
    fn balance_of(&self, account: &Address, asset: &AssetId) -> u64 {
        self.inner.balance_of(account, asset)
    }

    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: &AssetId,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.inner.transfer(from, to, asset, amount)?;
        self.transfers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn shared_wallet(quorum: usize, funds: u64) -> Arc<MultisigWallet<CountingLedger>> {
    let account = Address::derive("vault");
    let inner = InMemoryLedger::new();
    inner.deposit(account, AssetId::derive("USDC"), funds).unwrap();
    let ledger = CountingLedger {
        inner,
        transfers: AtomicUsize::new(0),
    };
    let registry = SignerRegistry::new(quorum, all_signers()).unwrap();
    Arc::new(MultisigWallet::new(account, registry, ledger))
}

#[test]
fn racing_approvals_execute_exactly_once() {
    let usdc = AssetId::derive("USDC");
    let recipient = Address::derive("recipient");
    let wallet = shared_wallet(4, 1_000);
    wallet.transfer(signer(0), 100, recipient, usdc).unwrap();

    let barrier = Arc::new(Barrier::new(SIGNERS - 1));
    let handles: Vec<_> = (1..SIGNERS)
        .map(|i| {
            let wallet = Arc::clone(&wallet);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                wallet.approve(signer(i), 0)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let executed = results
        .iter()
        .filter(|r| matches!(r, Ok(receipt) if receipt.executed()))
        .count();
    let recorded = results.iter().filter(|r| r.is_ok()).count();
    let too_late = results
        .iter()
        .filter(|r| matches!(r, Err(WalletError::AlreadyCompleted(0))))
        .count();

    assert_eq!(executed, 1);
    assert_eq!(recorded, 3);
    assert_eq!(too_late, SIGNERS - 1 - 3);
    assert_eq!(wallet.ledger().transfers.load(Ordering::SeqCst), 1);
    assert_eq!(wallet.transaction(0).unwrap().approval_count(), 4);
    assert_eq!(wallet.ledger().balance_of(&recipient, &usdc), 100);
}

#[test]
fn concurrent_submissions_get_unique_sequential_ids() {
    let usdc = AssetId::derive("USDC");
    let recipient = Address::derive("recipient");
    let wallet = shared_wallet(2, 1_000_000);

    let handles: Vec<_> = (0..SIGNERS)
        .map(|i| {
            let wallet = Arc::clone(&wallet);
            thread::spawn(move || {
                (0..10)
                    .map(|_| wallet.transfer(signer(i), 1, recipient, usdc).unwrap().tx_id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort_unstable();

    let expected: Vec<u64> = (0..(SIGNERS as u64 * 10)).collect();
    assert_eq!(ids, expected);
    assert_eq!(wallet.transaction_count(), SIGNERS as u64 * 10);
    assert_eq!(wallet.ledger().transfers.load(Ordering::SeqCst), 0);
}
