//! HTTP gateway for the product supply-chain contract.
//!
//! Translates REST calls into contract transactions and runs them on an
//! in-process peer. World state is either a JSON snapshot file (default) or
//! kept in memory for the life of the process (`--ephemeral`).

mod error;
mod peer;
mod routes;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracechain_common::{InMemoryLedger, LedgerState};

use crate::peer::LocalPeer;
use crate::routes::{build_router, AppState};
use crate::store::FileLedger;

#[derive(Parser)]
#[command(name = "tracechain-gateway", about = "Product supply-chain HTTP gateway")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// HTTP port to listen on.
    #[arg(long, default_value_t = 3333)]
    port: u16,

    /// Ledger snapshot file (default: <data dir>/tracechain/ledger.json).
    #[arg(long, conflicts_with = "ephemeral")]
    ledger_file: Option<PathBuf>,

    /// Keep the ledger in memory only.
    #[arg(long)]
    ephemeral: bool,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn open_ledger(cli: &Cli) -> Result<(Arc<dyn LedgerState>, String), String> {
    if cli.ephemeral {
        return Ok((Arc::new(InMemoryLedger::new()), "memory".to_string()));
    }
    let path = cli
        .ledger_file
        .clone()
        .unwrap_or_else(store::default_ledger_path);
    let ledger = FileLedger::open(&path)
        .map_err(|e| format!("Failed to open ledger {}: {}", path.display(), e))?;
    let backend = format!("file:{}", ledger.path().display());
    Ok((Arc::new(ledger), backend))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    let (ledger, backend) = match open_ledger(&cli) {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!(%backend, "ledger ready");

    let state = Arc::new(AppState::new(LocalPeer::new(ledger), backend));
    let app = build_router(state);

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}
