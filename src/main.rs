//! `custody` command-line front end.
//!
//! # Architecture Overview
//!
//! ```text
//!   custody <command>
//!        │
//!        ▼
//!   config (TOML + env) ──▶ logging / metrics
//!        │
//!        ▼
//!   lifecycle::startup ──▶ Session ◀── SignerAdapter ◀── wallet bridge
//!        │                   │
//!        │                   ▼
//!        └──────────────▶ Orchestrator ──▶ RelayClient ──▶ relay
//!                            │
//!                            ▼
//!                     ProposalRepository
//! ```
//!
//! Every command prints a JSON document on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use custody_orchestrator::config::{config_from_env, load_config};
use custody_orchestrator::lifecycle::{signals, Custody};
use custody_orchestrator::observability::{logging, metrics};
use custody_orchestrator::FlowError;

#[derive(Parser)]
#[command(name = "custody")]
#[command(about = "Create and co-sign multi-signature custody proposals", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Environment variables override it.
    #[arg(short, long, env = "CUSTODY_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show wallet session, role and balance
    Status,
    /// List the proposals visible to the connected wallet
    Proposals,
    /// Create a custody proposal (administrator only)
    Create {
        /// Signatures needed before the proposal is ready
        #[arg(short, long)]
        required: u32,
        /// Enable insurance on the custody account
        #[arg(long)]
        insurance: bool,
    },
    /// Approve a pending proposal with the connected wallet
    Approve {
        /// Proposal id
        id: String,
    },
    /// Deposit into the connected wallet's custody account
    Deposit {
        amount: u64,
    },
    /// Execute the withdrawal of a ready proposal
    Withdraw {
        /// Proposal id
        id: String,
        /// Explicit amount; otherwise the relay derives it from the proposal
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Wait until a proposal collects enough signatures
    Watch {
        /// Proposal id
        id: String,
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_config(path),
        None => config_from_env(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    if cli.json_logs {
        config.observability.json_logs = true;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "custody starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let custody = match Custody::from_config(config) {
        Ok(custody) => custody,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    custody.start().await;

    match run(&custody, cli.command).await {
        Ok(output) => {
            print_json(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let kind = e.kind();
            print_json(&json!({
                "error": e.to_string(),
                "kind": kind,
                "transient": kind.is_transient(),
            }));
            ExitCode::FAILURE
        }
    }
}

async fn run(custody: &Custody, command: Commands) -> Result<Value, FlowError> {
    let orchestrator = &custody.orchestrator;

    if !matches!(command, Commands::Status) {
        custody.ensure_connected().await?;
    }

    match command {
        Commands::Status => {
            let provider_available = custody.session.check_provider_available().await;
            if custody.session.actor().is_some() {
                custody.session.refresh_balance().await;
            }
            Ok(json!({
                "network": custody.config.network.label,
                "provider_available": provider_available,
                "session": custody.session.snapshot(),
                "proposals": custody.repository.status(),
            }))
        }
        Commands::Proposals => {
            let proposals = orchestrator.refresh().await?;
            let rows: Vec<Value> = proposals
                .iter()
                .map(|p| json!({ "proposal": p, "readiness": p.readiness() }))
                .collect();
            Ok(Value::Array(rows))
        }
        Commands::Create {
            required,
            insurance,
        } => {
            let tx_hash = orchestrator.create_proposal(required, insurance).await?;
            Ok(json!({ "tx_hash": tx_hash }))
        }
        Commands::Approve { id } => {
            orchestrator.approve_proposal(&id).await?;
            let readiness = orchestrator.readiness(&id).ok();
            Ok(json!({ "approved": id, "readiness": readiness }))
        }
        Commands::Deposit { amount } => {
            let tx_hash = orchestrator.deposit(amount).await?;
            Ok(json!({ "tx_hash": tx_hash }))
        }
        Commands::Withdraw { id, amount } => {
            let tx_hash = orchestrator.execute_withdrawal(&id, amount).await?;
            Ok(json!({ "proposal_id": id, "tx_hash": tx_hash }))
        }
        Commands::Watch {
            id,
            poll_secs,
            timeout_secs,
        } => {
            let wait = orchestrator.await_finalization(
                &id,
                Duration::from_secs(poll_secs.max(1)),
                Duration::from_secs(timeout_secs),
            );
            tokio::select! {
                result = wait => {
                    let proposal = result?;
                    Ok(json!({ "proposal": proposal, "readiness": proposal.readiness() }))
                }
                _ = signals::interrupted() => {
                    Ok(json!({ "proposal_id": id, "interrupted": true, "readiness": orchestrator.readiness(&id).ok() }))
                }
            }
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to render output: {}", e),
    }
}
