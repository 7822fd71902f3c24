//! Backend relay boundary.
//!
//! # Data Flow
//! ```text
//! Orchestrator / Repository
//!     → RelayClient (trait)
//!     → HttpRelayClient
//!         GET  /proposals
//!         POST /build_tx            { function, params }  → { ok, xdr?, error? }
//!         POST /withdraw_execute/id                       → { ok, xdr?, error? }
//!         POST /proposals/id/sign   { signer, signature } → { ok, error? }
//!         POST /submit_tx           { signed_xdr }        → { ok, tx_hash?, error? }
//! ```
//!
//! # Design Decisions
//! - The relay is authoritative for proposal status and signature counts
//! - `ok: false` surfaces as `RelayRejected` with the relay's text verbatim
//! - No retries; a failed call is reported and the caller decides

pub mod client;
pub mod types;

pub use client::{HttpRelayClient, RelayClient};
pub use types::{ContractCall, RelayError, RelayResult};
