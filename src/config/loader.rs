//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::CustodyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables recognised for each overridable field, in priority order.
///
/// The `VITE_*` names are accepted so an existing front-end `.env` file can be reused.
pub const ADMIN_IDENTITY_VARS: &[&str] =
    &["CUSTODY_ADMIN_IDENTITY", "VITE_ADMIN_WALLET", "VITE_DEPLOYER_ID"];
pub const RELAY_URL_VARS: &[&str] = &["CUSTODY_RELAY_URL", "VITE_BACKEND_URL"];
pub const LEDGER_URL_VARS: &[&str] = &["CUSTODY_LEDGER_URL", "VITE_HORIZON_URL"];
pub const NETWORK_PASSPHRASE_VARS: &[&str] =
    &["CUSTODY_NETWORK_PASSPHRASE", "VITE_NETWORK_PASSPHRASE"];
pub const NETWORK_LABEL_VARS: &[&str] = &["CUSTODY_NETWORK_LABEL", "VITE_NETWORK_NAME"];
pub const SIGNER_URL_VARS: &[&str] = &["CUSTODY_SIGNER_URL"];

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<CustodyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: CustodyConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment overrides only.
pub fn config_from_env() -> Result<CustodyConfig, ConfigError> {
    let mut config = CustodyConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values onto `config`. Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut CustodyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let first = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(*name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    };

    if let Some(v) = first(ADMIN_IDENTITY_VARS) {
        config.admin.identity = Some(v);
    }
    if let Some(v) = first(RELAY_URL_VARS) {
        config.relay.base_url = v;
    }
    if let Some(v) = first(LEDGER_URL_VARS) {
        config.ledger.url = v;
    }
    if let Some(v) = first(NETWORK_PASSPHRASE_VARS) {
        config.network.passphrase = v;
    }
    if let Some(v) = first(NETWORK_LABEL_VARS) {
        config.network.label = v;
    }
    if let Some(v) = first(SIGNER_URL_VARS) {
        config.signer.bridge_url = v;
    }

    if config.admin.identity.is_none() {
        tracing::warn!("Admin identity not configured; every caller will act as a signer");
    }
}
