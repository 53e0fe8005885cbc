//! # Multisig Wallet Contract
//!
//! A custodial account controlled by a [`SignerRegistry`]. Funds leave the
//! account only after a quorum of distinct signers has approved the
//! transfer. The lifecycle of a transfer request is:
//!
//! 1. **Submit**: a signer calls [`MultisigWallet::transfer`]. The request
//!    is validated, assigned the next id, and recorded with the submitter's
//!    approval already counted.
//! 2. **Approve**: other signers call [`MultisigWallet::approve`]. Each
//!    approval is counted once per signer.
//! 3. **Execute**: the call that brings the approval count to the quorum
//!    moves the funds through the [`AssetLedger`] and marks the transaction
//!    completed. With a quorum of one, that is the submission itself.
//!
//! ## Atomicity
//!
//! All transaction state sits behind one re-entrant mutex per wallet. A
//! submission or approval holds it from validation through the ledger
//! transfer to the `completed` commit, so two approvals for the same
//! transaction can never both see "quorum reached, not yet completed". If
//! the ledger refuses the transfer, the call fails as a unit: the approval
//! that triggered execution is not recorded, `completed` stays false, and a
//! later approval retries.
//!
//! While a ledger transfer is in flight the wallet is *executing*. A ledger
//! that calls back into the wallet from inside [`AssetLedger::transfer`]
//! gets the lock again on the same thread; queries answer normally, but
//! [`MultisigWallet::transfer`] and [`MultisigWallet::approve`] fail with
//! [`WalletError::ExecutionInProgress`] until the transfer returns.

use std::cell::RefCell;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parking_lot::ReentrantMutex;
use quorum_protocol::identity::Address;
use quorum_protocol::vault::{AssetId, AssetLedger, TransferError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signer_registry::SignerRegistry;

/// Sequential transaction identifier, starting at 0.
pub type TxId = u64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by wallet entry points.
///
/// Every variant is detected before any state changes, except
/// [`WalletError::TransferFailed`], which is detected at the ledger and
/// rolls the whole call back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    /// The caller is not in the signer set.
    #[error("invalid signer: {0} is not an authorized signer")]
    UnauthorizedSigner(Address),

    /// The transfer amount was zero.
    #[error("can't send zero amount")]
    ZeroAmount,

    /// The recipient was the null identity.
    #[error("invalid recipient: the zero address cannot receive funds")]
    InvalidRecipient,

    /// The asset was the null identity.
    #[error("invalid asset: address zero found")]
    InvalidAsset,

    /// The custodial account holds less than the requested amount.
    #[error("insufficient funds: vault holds {available} of {asset}, requested {requested}")]
    InsufficientFunds {
        /// The asset requested.
        asset: AssetId,
        /// Custodial balance at check time.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// No transaction has this id.
    #[error("transaction {0} not found")]
    TransactionNotFound(TxId),

    /// The transaction already executed.
    #[error("transaction {0} already completed")]
    AlreadyCompleted(TxId),

    /// The caller already approved this transaction.
    #[error("signer {signer} already approved transaction {tx_id}")]
    DuplicateApproval {
        /// Transaction being approved.
        tx_id: TxId,
        /// The repeat approver.
        signer: Address,
    },

    /// The ledger refused the transfer during execution.
    #[error("transfer for transaction {tx_id} failed: {source}")]
    TransferFailed {
        /// Transaction whose execution failed.
        tx_id: TxId,
        /// Ledger-reported reason.
        #[source]
        source: TransferError,
    },

    /// A submission or approval arrived from inside the ledger transfer of
    /// an executing transaction.
    #[error("transaction {0} is executing; re-entrant call rejected")]
    ExecutionInProgress(TxId),
}

impl WalletError {
    /// Stable snake_case code for this error, for metrics labels and API
    /// bodies. Never changes once published.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::UnauthorizedSigner(_) => "unauthorized_signer",
            WalletError::ZeroAmount => "zero_amount",
            WalletError::InvalidRecipient => "invalid_recipient",
            WalletError::InvalidAsset => "invalid_asset",
            WalletError::InsufficientFunds { .. } => "insufficient_funds",
            WalletError::TransactionNotFound(_) => "transaction_not_found",
            WalletError::AlreadyCompleted(_) => "already_completed",
            WalletError::DuplicateApproval { .. } => "duplicate_approval",
            WalletError::TransferFailed { .. } => "transfer_failed",
            WalletError::ExecutionInProgress(_) => "execution_in_progress",
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Waiting for approvals.
    Pending,
    /// Quorum reached and the transfer executed. Terminal.
    Completed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A transfer request and its approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequential id, assigned at creation.
    pub id: TxId,
    /// Amount of `asset` to move, in smallest units. Always positive.
    pub amount: u64,
    /// Destination of the funds. Never the null identity.
    pub recipient: Address,
    /// Asset being moved. Never the null asset.
    pub asset: AssetId,
    /// Signer that submitted the request.
    pub initiator: Address,
    /// Signers that have approved, the initiator included.
    pub approvals: BTreeSet<Address>,
    /// `true` once the transfer has executed. Never reverts.
    pub completed: bool,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the transfer executed, if it has.
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    fn new(
        id: TxId,
        initiator: Address,
        amount: u64,
        recipient: Address,
        asset: AssetId,
    ) -> Self {
        let mut approvals = BTreeSet::new();
        approvals.insert(initiator);
        Self {
            id,
            amount,
            recipient,
            asset,
            initiator,
            approvals,
            completed: false,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Number of distinct approvals recorded so far.
    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    /// Whether `signer` has approved this transaction.
    pub fn has_approved(&self, signer: &Address) -> bool {
        self.approvals.contains(signer)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TransactionStatus {
        if self.completed {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Pending
        }
    }
}

/// What a successful submission or approval led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// Recorded; still short of quorum.
    Pending {
        /// Approvals recorded so far.
        approvals: usize,
        /// Approvals required.
        quorum: usize,
    },
    /// Quorum reached and the transfer executed in this call.
    Executed,
}

/// Returned by [`MultisigWallet::transfer`] and [`MultisigWallet::approve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// The transaction acted on.
    pub tx_id: TxId,
    /// What the call led to.
    pub outcome: ApprovalOutcome,
    /// The transaction as this call committed it.
    pub transaction: Transaction,
}

impl Receipt {
    /// `true` if this call executed the transfer.
    pub fn executed(&self) -> bool {
        self.outcome == ApprovalOutcome::Executed
    }
}

// ---------------------------------------------------------------------------
// MultisigWallet
// ---------------------------------------------------------------------------

/// The transaction ledger and approval engine for one custodial account.
///
/// `MultisigWallet` is `Send + Sync` whenever its ledger is; share it across
/// threads or request handlers behind an `Arc`.
pub struct MultisigWallet<L> {
    /// The custodial account funds are paid out of.
    account: Address,
    /// Who may submit and approve, and how many approvals it takes.
    registry: SignerRegistry,
    /// Where balances live and transfers happen.
    ledger: L,
    /// Transactions and the execution marker.
    state: ReentrantMutex<RefCell<WalletState>>,
}

/// Mutable wallet state. Only borrowed while the wallet lock is held, and
/// never across a ledger call.
#[derive(Default)]
struct WalletState {
    /// All transactions, indexed by id. Append-only.
    transactions: Vec<Transaction>,
    /// The transaction whose ledger transfer is in flight, if any.
    executing: Option<TxId>,
}

impl WalletState {
    fn ensure_idle(&self) -> Result<(), WalletError> {
        match self.executing {
            Some(tx_id) => Err(WalletError::ExecutionInProgress(tx_id)),
            None => Ok(()),
        }
    }
}

impl<L: AssetLedger> MultisigWallet<L> {
    /// Creates a wallet with no transactions.
    ///
    /// # Arguments
    ///
    /// * `account` - The custodial account transfers are paid from.
    /// * `registry` - The signer set and quorum.
    /// * `ledger` - The asset-transfer collaborator.
    pub fn new(account: Address, registry: SignerRegistry, ledger: L) -> Self {
        tracing::info!(
            %account,
            signers = registry.signer_count(),
            quorum = registry.quorum(),
            "multisig wallet created"
        );
        Self {
            account,
            registry,
            ledger,
            state: ReentrantMutex::new(RefCell::new(WalletState::default())),
        }
    }

    /// Submits a transfer of `amount` of `asset` to `recipient`.
    ///
    /// The caller's approval is recorded as part of the submission. If that
    /// alone meets the quorum, the transfer executes before this returns.
    ///
    /// # Errors
    ///
    /// In check order: [`WalletError::UnauthorizedSigner`],
    /// [`WalletError::ZeroAmount`], [`WalletError::InvalidRecipient`],
    /// [`WalletError::InvalidAsset`], [`WalletError::InsufficientFunds`],
    /// and [`WalletError::TransferFailed`] if immediate execution fails.
    /// [`WalletError::ExecutionInProgress`] when called from inside an
    /// executing ledger transfer. On any error no transaction is created and
    /// no id is consumed.
    pub fn transfer(
        &self,
        caller: Address,
        amount: u64,
        recipient: Address,
        asset: AssetId,
    ) -> Result<Receipt, WalletError> {
        let result = self.submit(caller, amount, recipient, asset);
        if let Err(err) = &result {
            tracing::warn!(signer = %caller, amount, %recipient, %asset, code = err.code(), "transfer rejected: {}", err);
        }
        result
    }

    fn submit(
        &self,
        caller: Address,
        amount: u64,
        recipient: Address,
        asset: AssetId,
    ) -> Result<Receipt, WalletError> {
        if !self.registry.is_valid_signer(&caller) {
            return Err(WalletError::UnauthorizedSigner(caller));
        }
        if amount == 0 {
            return Err(WalletError::ZeroAmount);
        }
        if recipient.is_zero() {
            return Err(WalletError::InvalidRecipient);
        }
        if asset.is_zero() {
            return Err(WalletError::InvalidAsset);
        }

        let guard = self.state.lock();
        guard.borrow().ensure_idle()?;

        let available = self.ledger.balance_of(&self.account, &asset);
        if available < amount {
            return Err(WalletError::InsufficientFunds {
                asset,
                available,
                requested: amount,
            });
        }

        let id = guard.borrow().transactions.len() as TxId;
        let mut tx = Transaction::new(id, caller, amount, recipient, asset);
        let outcome = self.settle(&guard, &mut tx)?;
        guard.borrow_mut().transactions.push(tx.clone());

        tracing::info!(tx_id = id, initiator = %caller, amount, %recipient, %asset, "transaction submitted");
        Ok(Receipt {
            tx_id: id,
            outcome,
            transaction: tx,
        })
    }

    /// Records `caller`'s approval of transaction `tx_id`.
    ///
    /// If this approval completes the quorum, the transfer executes before
    /// this returns.
    ///
    /// # Errors
    ///
    /// In check order: [`WalletError::ExecutionInProgress`] when called from
    /// inside an executing ledger transfer, [`WalletError::TransactionNotFound`],
    /// [`WalletError::AlreadyCompleted`], [`WalletError::UnauthorizedSigner`],
    /// [`WalletError::DuplicateApproval`], and
    /// [`WalletError::TransferFailed`] if execution fails. On any error the
    /// approval is not recorded.
    pub fn approve(&self, caller: Address, tx_id: TxId) -> Result<Receipt, WalletError> {
        let result = self.record_approval(caller, tx_id);
        if let Err(err) = &result {
            tracing::warn!(tx_id, signer = %caller, code = err.code(), "approval rejected: {}", err);
        }
        result
    }

    fn record_approval(&self, caller: Address, tx_id: TxId) -> Result<Receipt, WalletError> {
        let guard = self.state.lock();

        // Work on a copy so a failed execution leaves the stored record as it was.
        let (slot, mut candidate) = {
            let state = guard.borrow();
            state.ensure_idle()?;

            let slot = usize::try_from(tx_id)
                .ok()
                .filter(|index| *index < state.transactions.len())
                .ok_or(WalletError::TransactionNotFound(tx_id))?;
            let current = &state.transactions[slot];

            if current.completed {
                return Err(WalletError::AlreadyCompleted(tx_id));
            }
            if !self.registry.is_valid_signer(&caller) {
                return Err(WalletError::UnauthorizedSigner(caller));
            }
            if current.has_approved(&caller) {
                return Err(WalletError::DuplicateApproval {
                    tx_id,
                    signer: caller,
                });
            }
            (slot, current.clone())
        };

        candidate.approvals.insert(caller);
        let outcome = self.settle(&guard, &mut candidate)?;
        let approvals = candidate.approval_count();
        guard.borrow_mut().transactions[slot] = candidate.clone();

        tracing::debug!(tx_id, signer = %caller, approvals, "approval recorded");
        Ok(Receipt {
            tx_id,
            outcome,
            transaction: candidate,
        })
    }

    /// Executes `tx` if it has reached quorum. Must be called with the wallet
    /// lock held and no borrow of `state` outstanding.
    fn settle(
        &self,
        state: &RefCell<WalletState>,
        tx: &mut Transaction,
    ) -> Result<ApprovalOutcome, WalletError> {
        let quorum = self.registry.quorum();
        let approvals = tx.approval_count();
        if approvals < quorum {
            return Ok(ApprovalOutcome::Pending { approvals, quorum });
        }

        state.borrow_mut().executing = Some(tx.id);
        let transferred = self
            .ledger
            .transfer(&self.account, &tx.recipient, &tx.asset, tx.amount);
        state.borrow_mut().executing = None;

        transferred.map_err(|source| {
            tracing::warn!(tx_id = tx.id, "execution failed at ledger: {}", source);
            WalletError::TransferFailed {
                tx_id: tx.id,
                source,
            }
        })?;

        tx.completed = true;
        tx.executed_at = Some(Utc::now());
        tracing::info!(
            tx_id = tx.id,
            amount = tx.amount,
            recipient = %tx.recipient,
            asset = %tx.asset,
            approvals,
            "transaction executed"
        );
        Ok(ApprovalOutcome::Executed)
    }

    // -- Queries --------------------------------------------------------------

    /// Returns a copy of transaction `tx_id`.
    pub fn transaction(&self, tx_id: TxId) -> Result<Transaction, WalletError> {
        let guard = self.state.lock();
        let state = guard.borrow();
        usize::try_from(tx_id)
            .ok()
            .and_then(|index| state.transactions.get(index))
            .cloned()
            .ok_or(WalletError::TransactionNotFound(tx_id))
    }

    /// Number of transactions ever created.
    pub fn transaction_count(&self) -> u64 {
        let guard = self.state.lock();
        let count = guard.borrow().transactions.len();
        count as u64
    }

    /// Copies of all transactions, in id order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let guard = self.state.lock();
        let transactions = guard.borrow().transactions.clone();
        transactions
    }

    /// Copies of all transactions still waiting for approvals, in id order.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        let guard = self.state.lock();
        let pending = guard
            .borrow()
            .transactions
            .iter()
            .filter(|tx| !tx.completed)
            .cloned()
            .collect();
        pending
    }

    /// Number of transactions still waiting for approvals.
    pub fn pending_count(&self) -> usize {
        let guard = self.state.lock();
        let count = guard
            .borrow()
            .transactions
            .iter()
            .filter(|tx| !tx.completed)
            .count();
        count
    }

    /// The transaction whose ledger transfer is in flight, if any. Only ever
    /// `Some` when asked from inside that transfer.
    pub fn executing(&self) -> Option<TxId> {
        let guard = self.state.lock();
        let executing = guard.borrow().executing;
        executing
    }

    /// Whether `signer` has approved transaction `tx_id`.
    pub fn has_approved(&self, tx_id: TxId, signer: &Address) -> Result<bool, WalletError> {
        Ok(self.transaction(tx_id)?.has_approved(signer))
    }

    /// The custodial account's current balance of `asset`.
    pub fn custodial_balance(&self, asset: &AssetId) -> u64 {
        self.ledger.balance_of(&self.account, asset)
    }

    /// Whether `identity` is one of the signers.
    pub fn is_valid_signer(&self, identity: &Address) -> bool {
        self.registry.is_valid_signer(identity)
    }

    /// Number of signers.
    pub fn signer_count(&self) -> usize {
        self.registry.signer_count()
    }

    /// Approvals required to execute.
    pub fn quorum(&self) -> usize {
        self.registry.quorum()
    }

    /// The custodial account.
    pub fn account(&self) -> Address {
        self.account
    }

    /// The signer registry.
    pub fn registry(&self) -> &SignerRegistry {
        &self.registry
    }

    /// The asset ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}
