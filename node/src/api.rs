//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the vault over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                          |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/health`                     | Liveness probe                       |
//! | GET    | `/status`                     | Vault status summary                 |
//! | GET    | `/signers`                    | Signer set and quorum                |
//! | GET    | `/signers/:address`           | Whether an address is a signer       |
//! | POST   | `/transactions`               | Submit a transfer request            |
//! | GET    | `/transactions`               | All transactions (`?pending=true`)   |
//! | GET    | `/transactions/:id`           | Transaction by id                    |
//! | POST   | `/transactions/:id/approve`   | Approve a transaction                |
//! | POST   | `/deposits`                   | Fund the custodial account (devnet)  |
//! | GET    | `/balances/:account`          | All non-zero balances of an account  |
//! | GET    | `/balances/:account/:asset`   | Ledger balance                       |
//! | GET    | `/ws`                         | WebSocket for live wallet events     |
//!
//! ## Caller identity
//!
//! Submissions and approvals act on behalf of the address in the
//! `x-signer` header. The node trusts that header; authenticating it is the
//! job of whatever sits in front of the node. A missing or malformed header
//! is a 401.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use quorum_contracts::multisig_wallet::{
    ApprovalOutcome, MultisigWallet, Receipt, Transaction, TxId, WalletError,
};
use quorum_protocol::identity::Address;
use quorum_protocol::vault::{AssetId, AssetLedger, BalanceError, InMemoryLedger};

use crate::metrics::SharedMetrics;

/// Header carrying the caller's address.
pub const SIGNER_HEADER: &str = "x-signer";

/// The wallet as the node runs it: backed by a shared in-memory ledger.
pub type VaultWallet = MultisigWallet<Arc<InMemoryLedger>>;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The approval engine.
    pub wallet: Arc<VaultWallet>,
    /// The ledger the wallet pays out of. Shared with the wallet so
    /// deposits and balance queries see the same books.
    pub ledger: Arc<InMemoryLedger>,
    /// Broadcast channel for live wallet events.
    pub event_tx: broadcast::Sender<WalletEvent>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    fn publish(&self, event: WalletEvent) {
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }

    fn reject(&self, err: WalletError) -> ApiError {
        self.metrics.record_rejection(err.code());
        ApiError::Wallet(err)
    }

    fn refresh_pending(&self) {
        self.metrics
            .pending_transactions
            .set(self.wallet.pending_count() as i64);
    }
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WalletEvent {
    /// A transfer request was accepted.
    #[serde(rename = "transaction_submitted")]
    TransactionSubmitted {
        tx_id: TxId,
        initiator: Address,
        amount: u64,
        recipient: Address,
        asset: AssetId,
    },
    /// A signer approved a pending transaction.
    #[serde(rename = "approval_recorded")]
    ApprovalRecorded {
        tx_id: TxId,
        signer: Address,
        approvals: usize,
        quorum: usize,
    },
    /// A transaction reached quorum and its transfer executed.
    #[serde(rename = "transaction_executed")]
    TransactionExecuted {
        tx_id: TxId,
        amount: u64,
        recipient: Address,
        asset: AssetId,
    },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/signers", get(signers_handler))
        .route("/signers/:address", get(signer_handler))
        .route(
            "/transactions",
            get(list_transactions_handler).post(submit_handler),
        )
        .route("/transactions/:id", get(transaction_handler))
        .route("/transactions/:id/approve", post(approve_handler))
        .route("/deposits", post(deposit_handler))
        .route("/balances/:account", get(holdings_handler))
        .route("/balances/:account/:asset", get(balance_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /transactions`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in smallest units.
    pub amount: u64,
    /// Destination account.
    pub recipient: Address,
    /// Asset to move.
    pub asset: AssetId,
}

/// Body of `POST /deposits`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Asset to credit.
    pub asset: AssetId,
    /// Amount in smallest units.
    pub amount: u64,
}

/// Query string of `GET /transactions`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only return transactions still waiting for approvals.
    #[serde(default)]
    pub pending: bool,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Custodial account.
    pub account: Address,
    /// Approvals required to execute.
    pub quorum: usize,
    /// Number of signers.
    pub signer_count: usize,
    /// Transactions ever created.
    pub transaction_count: u64,
    /// Transactions waiting for approvals.
    pub pending_count: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /signers`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignersResponse {
    pub signers: Vec<Address>,
    pub quorum: usize,
}

/// Response payload for `GET /signers/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignerResponse {
    pub address: Address,
    pub valid: bool,
}

/// Response payload for balance queries and deposits.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub asset: AssetId,
    pub balance: u64,
}

/// One asset balance in a [`HoldingsResponse`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: AssetId,
    pub balance: u64,
}

/// Response payload for `GET /balances/:account`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HoldingsResponse {
    pub account: Address,
    /// Non-zero balances, ordered by asset id.
    pub holdings: Vec<Holding>,
}

/// Error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable snake_case code.
    pub code: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// The wallet rejected the call.
    Wallet(WalletError),
    /// The ledger rejected a deposit.
    Balance(BalanceError),
    /// The caller identity header is missing or malformed.
    Unauthenticated(String),
    /// A path or body value could not be used.
    BadRequest {
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Wallet(err) => match err {
                WalletError::UnauthorizedSigner(_) => StatusCode::FORBIDDEN,
                WalletError::ZeroAmount
                | WalletError::InvalidRecipient
                | WalletError::InvalidAsset => StatusCode::BAD_REQUEST,
                WalletError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                WalletError::AlreadyCompleted(_)
                | WalletError::DuplicateApproval { .. }
                | WalletError::ExecutionInProgress(_) => StatusCode::CONFLICT,
                WalletError::InsufficientFunds { .. } | WalletError::TransferFailed { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
            ApiError::Balance(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Wallet(err) => err.code(),
            ApiError::Balance(BalanceError::InsufficientBalance { .. }) => "insufficient_balance",
            ApiError::Balance(BalanceError::Overflow { .. }) => "balance_overflow",
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::BadRequest { code, .. } => *code,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Wallet(err) => err.to_string(),
            ApiError::Balance(err) => err.to_string(),
            ApiError::Unauthenticated(message) | ApiError::BadRequest { message, .. } => {
                message.clone()
            }
        }
    }

    fn invalid_address(what: &str, value: &str) -> Self {
        ApiError::BadRequest {
            code: "invalid_address",
            message: format!("invalid {what}: {value:?}"),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        ApiError::Wallet(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
            code: self.code().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Reads the caller's address from the [`SIGNER_HEADER`].
fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    let value = headers
        .get(SIGNER_HEADER)
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {SIGNER_HEADER} header")))?;
    let text = value
        .to_str()
        .map_err(|_| ApiError::Unauthenticated(format!("{SIGNER_HEADER} is not valid text")))?;
    text.trim().parse::<Address>().map_err(|e| {
        ApiError::Unauthenticated(format!("malformed {SIGNER_HEADER} header: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: vault configuration and counters.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let wallet = &state.wallet;
    Json(StatusResponse {
        version: state.version.clone(),
        account: wallet.account(),
        quorum: wallet.quorum(),
        signer_count: wallet.signer_count(),
        transaction_count: wallet.transaction_count(),
        pending_count: wallet.pending_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn signers_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(SignersResponse {
        signers: state.wallet.registry().signers().to_vec(),
        quorum: state.wallet.quorum(),
    })
}

async fn signer_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SignerResponse>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|_| ApiError::invalid_address("address", &address))?;
    Ok(Json(SignerResponse {
        address,
        valid: state.wallet.is_valid_signer(&address),
    }))
}

/// `POST /transactions`: the caller submits a transfer, approving it in
/// the same step.
async fn submit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Receipt>), ApiError> {
    let signer = caller(&headers)?;

    let timer = state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["submit"])
        .start_timer();
    let result = state
        .wallet
        .transfer(signer, req.amount, req.recipient, req.asset);
    timer.observe_duration();
    let receipt = result.map_err(|e| state.reject(e))?;

    state.metrics.transactions_submitted_total.inc();
    state.publish(WalletEvent::TransactionSubmitted {
        tx_id: receipt.tx_id,
        initiator: signer,
        amount: req.amount,
        recipient: req.recipient,
        asset: req.asset,
    });
    if receipt.executed() {
        state.metrics.transfers_executed_total.inc();
        state.publish(WalletEvent::TransactionExecuted {
            tx_id: receipt.tx_id,
            amount: req.amount,
            recipient: req.recipient,
            asset: req.asset,
        });
    }
    state.refresh_pending();

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// `POST /transactions/:id/approve`: the caller approves a pending
/// transaction. Executes the transfer if this approval reaches quorum.
async fn approve_handler(
    State(state): State<AppState>,
    Path(tx_id): Path<TxId>,
    headers: HeaderMap,
) -> Result<Json<Receipt>, ApiError> {
    let signer = caller(&headers)?;

    let timer = state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["approve"])
        .start_timer();
    let result = state.wallet.approve(signer, tx_id);
    timer.observe_duration();
    let receipt = result.map_err(|e| state.reject(e))?;

    let transaction = &receipt.transaction;
    state.metrics.approvals_recorded_total.inc();
    state.publish(WalletEvent::ApprovalRecorded {
        tx_id,
        signer,
        approvals: transaction.approval_count(),
        quorum: state.wallet.quorum(),
    });
    if let ApprovalOutcome::Executed = receipt.outcome {
        state.metrics.transfers_executed_total.inc();
        state.publish(WalletEvent::TransactionExecuted {
            tx_id,
            amount: transaction.amount,
            recipient: transaction.recipient,
            asset: transaction.asset,
        });
    }
    state.refresh_pending();

    Ok(Json(receipt))
}

async fn list_transactions_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let transactions = if query.pending {
        state.wallet.pending_transactions()
    } else {
        state.wallet.transactions()
    };
    Json(transactions)
}

async fn transaction_handler(
    Path(tx_id): Path<TxId>,
    State(state): State<AppState>,
) -> Result<Json<Transaction>, ApiError> {
    Ok(Json(state.wallet.transaction(tx_id)?))
}

/// `POST /deposits`: credits the custodial account. Devnet funding only;
/// there is no signer check.
async fn deposit_handler(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    if req.asset.is_zero() {
        return Err(ApiError::Wallet(WalletError::InvalidAsset));
    }
    if req.amount == 0 {
        return Err(ApiError::Wallet(WalletError::ZeroAmount));
    }

    let account = state.wallet.account();
    let balance = state
        .ledger
        .deposit(account, req.asset, req.amount)
        .map_err(ApiError::Balance)?;
    tracing::info!(%account, asset = %req.asset, amount = req.amount, balance, "custodial account funded");

    Ok(Json(BalanceResponse {
        account,
        asset: req.asset,
        balance,
    }))
}

async fn balance_handler(
    Path((account, asset)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account: Address = account
        .parse()
        .map_err(|_| ApiError::invalid_address("account", &account))?;
    let asset: AssetId = asset
        .parse()
        .map_err(|_| ApiError::invalid_address("asset", &asset))?;

    Ok(Json(BalanceResponse {
        account,
        asset,
        balance: state.ledger.balance_of(&account, &asset),
    }))
}

async fn holdings_handler(
    Path(account): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<HoldingsResponse>, ApiError> {
    let account: Address = account
        .parse()
        .map_err(|_| ApiError::invalid_address("account", &account))?;

    let holdings = state
        .ledger
        .holdings(&account)
        .into_iter()
        .map(|(asset, balance)| Holding { asset, balance })
        .collect();
    Ok(Json(HoldingsResponse { account, holdings }))
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`WalletEvent`] messages. The channel is
/// push-only; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Forwards broadcast events to one socket until the client disconnects or
/// the channel closes.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
