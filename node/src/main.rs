// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Quorum Vault Node
//!
//! Entry point for the `quorum-node` binary. Parses CLI arguments, loads the
//! vault configuration, initializes logging and metrics, and serves the
//! HTTP/WS API over a multi-signer wallet.
//!
//! The binary supports three subcommands:
//!
//! - `run`: start the node from a TOML config
//! - `init`: write a devnet config with derived signer addresses
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use quorum_contracts::multisig_wallet::MultisigWallet;
use quorum_protocol::config::EVENT_CHANNEL_CAPACITY;
use quorum_protocol::vault::InMemoryLedger;

use cli::{Commands, QuorumNodeCli};
use config::NodeConfig;
use metrics::WalletMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = QuorumNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the config, applies CLI overrides, and validates the result.
fn load_config(args: &cli::RunArgs) -> Result<NodeConfig> {
    let mut config = NodeConfig::load_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    if let Some(port) = args.rpc_port {
        config.server.rpc_port = port;
    }
    if let Some(port) = args.metrics_port {
        config.server.metrics_port = port;
    }
    if let Some(format) = args.log_format {
        config.server.log_format = format;
    }

    config
        .validate()
        .context("configuration invalid after command-line overrides")?;
    Ok(config)
}

/// Starts the node: wallet, API server, and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    logging::init_logging(&config.server.log_level, config.server.log_format);

    tracing::info!(
        config = %args.config.display(),
        rpc_port = config.server.rpc_port,
        metrics_port = config.server.metrics_port,
        "starting quorum-node"
    );

    // --- Ledger ---
    let ledger = Arc::new(InMemoryLedger::new());
    for deposit in &config.wallet.deposits {
        ledger
            .deposit(config.wallet.account, deposit.asset, deposit.amount)
            .with_context(|| format!("failed to seed {} of {}", deposit.amount, deposit.asset))?;
    }

    // --- Wallet ---
    let registry = config.signer_registry()?;
    let wallet = Arc::new(MultisigWallet::new(
        config.wallet.account,
        registry,
        Arc::clone(&ledger),
    ));

    // --- Metrics ---
    let wallet_metrics =
        Arc::new(WalletMetrics::new().context("failed to register prometheus metrics")?);

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            quorum_protocol::config::PROTOCOL_VERSION,
        ),
        wallet,
        ledger,
        event_tx,
        metrics: Arc::clone(&wallet_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", config.server.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&wallet_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.server.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("quorum-node stopped");
    Ok(())
}

/// Writes a devnet configuration, to `--output` or stdout.
fn init_config(args: cli::InitArgs) -> Result<()> {
    let config = NodeConfig::devnet(args.signers, args.quorum);
    config
        .validate()
        .context("invalid devnet signer/quorum combination")?;
    let text = config.to_toml()?;

    let Some(path) = args.output else {
        print!("{text}");
        return Ok(());
    };

    if path.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(&path, &text)
        .with_context(|| format!("failed to write config to {}", path.display()))?;

    println!("Devnet config written.");
    println!("  Path     : {}", path.display());
    println!("  Account  : {}", config.wallet.account);
    println!("  Quorum   : {} of {}", config.wallet.quorum, config.wallet.signers.len());
    for (i, signer) in config.wallet.signers.iter().enumerate() {
        println!("  Signer {} : {}", i + 1, signer);
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("quorum-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", quorum_protocol::config::version_string());
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
