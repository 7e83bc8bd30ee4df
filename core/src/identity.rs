//! The authenticated caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::UserId;

/// Application role carried by the identity token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Business owner
    Admin,
    /// Client; the default
    #[default]
    Cliente,
}

impl Role {
    /// Parse a role claim, returning `None` for values that are not application roles.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "cliente" => Some(Self::Cliente),
            _ => None,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cliente => "cliente",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified caller identity, attached to each request after token verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject id
    pub user_id: UserId,
    /// Email claim, when present
    pub email: Option<String>,
    /// Resolved role
    pub role: Role,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub const fn new(user_id: UserId, email: Option<String>, role: Role) -> Self {
        Self {
            user_id,
            email,
            role,
        }
    }

    /// `true` for business owners.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
