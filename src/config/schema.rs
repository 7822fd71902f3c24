//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the orchestrator.
//! All types derive Serde traits for deserialization from config files, and every
//! section falls back to testnet-friendly defaults.

use serde::{Deserialize, Serialize};

/// Root configuration for the custody orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CustodyConfig {
    /// Ledger network identity used when signing.
    pub network: NetworkConfig,

    /// Backend relay location.
    pub relay: RelayConfig,

    /// Ledger query service (balance lookups).
    pub ledger: LedgerConfig,

    /// External signing provider.
    pub signer: SignerConfig,

    /// Administrator identity.
    pub admin: AdminConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network passphrase and display label.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Passphrase the signer must sign against (e.g. the Stellar testnet passphrase).
    pub passphrase: String,

    /// Human-readable network name for display only.
    pub label: String,
}

/// Stellar testnet passphrase.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            passphrase: TESTNET_PASSPHRASE.to_string(),
            label: "Testnet".to_string(),
        }
    }
}

/// Backend relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Base URL of the relay (no trailing slash required).
    pub base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

/// Ledger query service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Horizon-style REST endpoint.
    pub url: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: "https://horizon-testnet.stellar.org".to_string(),
        }
    }
}

/// Signing provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Wallet bridge endpoint.
    pub bridge_url: String,

    /// Only attempt silent auto-connect when the bridge runs on a loopback host.
    pub auto_connect_local_only: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://127.0.0.1:8765".to_string(),
            auto_connect_local_only: false,
        }
    }
}

/// Administrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Identity granted the Admin role. `None` means nobody is Admin.
    pub identity: Option<String>,
}

/// Timeout configuration for every external call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Relay request timeout in seconds.
    pub relay_secs: u64,

    /// Ledger query timeout in seconds.
    pub ledger_secs: u64,

    /// Signer call timeout in seconds (covers the user confirming in the wallet).
    pub signer_secs: u64,

    /// Provider availability probe timeout in milliseconds.
    pub probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            relay_secs: 15,
            ledger_secs: 10,
            signer_secs: 120,
            probe_ms: 1500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
