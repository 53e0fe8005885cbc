//! # CLI Interface
//!
//! Defines the command-line argument structure for `quorum-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Quorum vault node.
///
/// Serves a multi-signer custodial vault over HTTP: signers submit transfer
/// requests, approve them, and the node executes each transfer once enough
/// of them agree.
#[derive(Parser, Debug)]
#[command(
    name = "quorum-node",
    about = "Quorum multi-signer vault node",
    version,
    propagate_version = true
)]
pub struct QuorumNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the vault node.
    Run(RunArgs),
    /// Write a devnet configuration file.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
///
/// Ports and log format given here override the config file.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    #[arg(long, short = 'c', env = "QUORUM_CONFIG", default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Port for the REST/WebSocket API.
    #[arg(long, env = "QUORUM_RPC_PORT")]
    pub rpc_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "QUORUM_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log output format.
    #[arg(long, env = "QUORUM_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the configuration. Printed to stdout when omitted.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Number of derived devnet signers.
    #[arg(long, default_value_t = 3)]
    pub signers: usize,

    /// Approvals required to execute a transfer.
    #[arg(long, default_value_t = 2)]
    pub quorum: usize,

    /// Overwrite an existing file at `--output`.
    #[arg(long)]
    pub force: bool,
}
