//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to relay / ledger / signer:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On timeout: caller maps to NetworkError / ProviderError
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries: signing and submission are never repeated without a new
//!   caller action

pub mod timeouts;

pub use timeouts::with_deadline;
