//! The signed-in user as seen by the core.

use serde::{Deserialize, Serialize};

use crate::types::{BusinessUnitId, UserId};

/// Role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl Role {
    /// Returns true if the role may review and decide exchanges.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Ok(Role::Employee),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Identity of the caller, supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    pub business_unit_id: BusinessUnitId,
    pub display_name: String,
    /// Bearer token forwarded to backend calls.
    pub token: String,
}

impl Identity {
    /// Returns true if the identity carries a usable bearer token.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}
