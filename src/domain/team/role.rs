//! Team roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Role a user holds within a team.
///
/// Exactly one `Owner` exists per team, created together with the team.
/// Invitations and role changes can only grant `Admin` or `Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Owners and admins may invite, cancel invitations and list them.
    pub fn can_manage_invitations(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Owners and admins may remove members and change their roles.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Validates a role offered by an invitation or a role change.
    pub fn ensure_grantable(self) -> Result<Self, ValidationError> {
        match self {
            Role::Admin | Role::Member => Ok(self),
            Role::Owner => Err(ValidationError::invalid_format(
                "role",
                "only admin or member can be granted",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}
