//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → CustodyConfig (validated, immutable)
//!     → handed to each subsystem at the composition point
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    AdminConfig, CustodyConfig, LedgerConfig, NetworkConfig, ObservabilityConfig, RelayConfig,
    SignerConfig, TimeoutConfig,
};
