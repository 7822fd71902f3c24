//! Caller role derivation.

use serde::Serialize;

/// Authorization role of a connected identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Signer,
}

impl Role {
    /// `Admin` iff the trimmed identity equals the trimmed admin identity (case-sensitive).
    ///
    /// A missing or blank admin identity makes everyone a `Signer`.
    pub fn derive(identity: &str, admin_identity: Option<&str>) -> Role {
        match admin_identity.map(str::trim) {
            Some(admin) if !admin.is_empty() && admin == identity.trim() => Role::Admin,
            _ => Role::Signer,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Signer => write!(f, "signer"),
        }
    }
}
