//! OS signal handling.
//!
//! # Responsibilities
//! - Stop long-running commands (`watch`) on SIGINT / Ctrl-C
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed handler registration never resolves, so the command runs to its own deadline

/// Resolve when the process is interrupted.
pub async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received");
}
