//! Approval message construction.

const APPROVAL_PREFIX: &str = "Approve custody proposal ID: ";

/// Text a co-signer signs to approve proposal `id`. Embeds the id verbatim.
pub fn approval_message(proposal_id: &str) -> String {
    format!("{}{}", APPROVAL_PREFIX, proposal_id)
}

/// Inverse of `approval_message`.
pub fn approved_proposal_id(message: &str) -> Option<&str> {
    message.strip_prefix(APPROVAL_PREFIX)
}
