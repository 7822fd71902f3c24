//! Ledger query subsystem.
//!
//! # Data Flow
//! ```text
//! Session (connected identity)
//!     → LedgerQuery (trait)
//!     → HorizonClient: GET {ledger_url}/accounts/{id}
//!     → native balance line → Balance (two decimals)
//! ```
//!
//! # Design Decisions
//! - Read-only and advisory: callers degrade any failure to `Balance::Unavailable`
//! - Every request has a deadline

pub mod client;
pub mod types;

pub use client::{HorizonClient, LedgerQuery};
pub use types::{Balance, LedgerError, LedgerResult};
