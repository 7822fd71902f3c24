//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every endpoint is an absolute http(s) URL
//! - Validate value ranges (timeouts > 0, metrics address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CustodyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::CustodyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &CustodyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url("relay.base_url", &config.relay.base_url, &mut errors);
    check_url("ledger.url", &config.ledger.url, &mut errors);
    check_url("signer.bridge_url", &config.signer.bridge_url, &mut errors);

    if config.network.passphrase.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "network.passphrase",
        });
    }

    let timeouts = [
        ("timeouts.relay_secs", config.timeouts.relay_secs),
        ("timeouts.ledger_secs", config.timeouts.ledger_secs),
        ("timeouts.signer_secs", config.timeouts.signer_secs),
        ("timeouts.probe_ms", config.timeouts.probe_ms),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&CustodyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = CustodyConfig::default();
        config.relay.base_url = "not a url".into();
        config.ledger.url = "ftp://horizon".into();
        config.network.passphrase = "   ".into();
        config.timeouts.relay_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUrl { field: "ledger.url", .. })));
        assert!(errors.contains(&ValidationError::Zero {
            field: "timeouts.relay_secs"
        }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = CustodyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MetricsAddress("nowhere".into())]
        );
    }
}
