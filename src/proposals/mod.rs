//! Proposal subsystem.
//!
//! # Data Flow
//! ```text
//! RelayClient::list_proposals (authoritative, all proposals)
//!     → repository.rs (monotonic Ready guard, role filter, stale-response guard)
//!     → ArcSwap view read by the orchestrator and the CLI
//! ```

pub mod repository;
pub mod types;

pub use repository::{filter_for_role, ProposalRepository, RepositoryStatus};
pub use types::{Proposal, ProposalStatus, Readiness, SignatureRecord};
