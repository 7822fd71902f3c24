//! Proposal data model.

use serde::Serialize;

/// Relay-reported proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Ready,
}

impl ProposalStatus {
    /// Parse a relay status label.
    ///
    /// The later-stage labels the relay uses once a proposal has met its threshold all
    /// count as `Ready`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ProposalStatus::Pending),
            "ready" | "ready_to_submit" | "submitted" | "completed" => Some(ProposalStatus::Ready),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Ready => write!(f, "ready"),
        }
    }
}

/// One collected approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRecord {
    /// Approving identity; `None` when the relay reports only the signature.
    pub signer: Option<String>,
    pub signature: String,
}

/// A custody proposal as last reported by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub id: String,
    pub owner: String,
    pub required_signatures: u32,
    pub insurance_enabled: bool,
    /// Approval order.
    pub signatures: Vec<SignatureRecord>,
    pub status: ProposalStatus,
}

impl Proposal {
    pub fn is_ready(&self) -> bool {
        self.status == ProposalStatus::Ready
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            status: self.status,
            collected: self.signatures.len(),
            required: self.required_signatures,
        }
    }
}

/// Signature progress of a proposal. Display only; `status` stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub status: ProposalStatus,
    pub collected: usize,
    pub required: u32,
}

impl Readiness {
    /// Signatures still missing by count.
    pub fn remaining(&self) -> usize {
        (self.required as usize).saturating_sub(self.collected)
    }
}
