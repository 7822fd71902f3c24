//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every relay, ledger and signer call with a deadline
//! - Turn an elapsed deadline into the caller's own error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timed-out call is a failure, never a success

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Run `fut` with a deadline; `on_timeout` builds the error when it elapses.
pub async fn with_deadline<T, E, F, M>(limit: Duration, fut: F, on_timeout: M) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    M: FnOnce(Duration) -> E,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}
