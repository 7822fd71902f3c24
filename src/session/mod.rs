//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! SignerAdapter (identity) ──┐
//! admin identity (config) ───┼→ Session → SessionSnapshot { phase, identity, role, balance, epoch }
//! LedgerQuery (balance) ─────┘        → watch subscribers (CLI `watch`, orchestrator gating)
//! ```

pub mod role;
pub mod state;

pub use role::Role;
pub use state::{ConnectionPhase, Session, SessionSnapshot};
