//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Proposal id, identity and request id are carried as structured fields
//! - Signatures and signed payloads are never logged in full

pub mod logging;
pub mod metrics;

/// Shorten an identity or payload for log output.
pub fn abbreviate(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 12 {
        return value.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::abbreviate;

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("GSHORT"), "GSHORT");
        assert_eq!(
            abbreviate("GABCDEFGHIJKLMNOPQRSTUVWXYZ"),
            "GABCD...VWXYZ"
        );
    }
}
