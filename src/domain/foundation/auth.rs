//! Authentication types for the domain layer.
//!
//! `AuthenticatedUser` is the typed claim set produced once, when a bearer
//! token is verified, and passed by value into every handler afterwards.
//! Nothing downstream ever looks at raw claim maps.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Email, UserId};

/// Authenticated user extracted from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,

    /// Address asserted by the token; invitation acceptance compares against it.
    pub email: Email,

    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Email, display_name: Option<String>) -> Self {
        Self {
            id,
            email,
            display_name,
        }
    }

    /// Returns the display name, or the email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.email.as_str())
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// Signature was fine but a claim could not be turned into a domain value.
    #[error("Invalid claim '{0}'")]
    InvalidClaim(&'static str),
}

impl AuthError {
    /// Returns true if the caller should obtain a fresh token.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        let email = Email::new("dev@example.com").unwrap();
        let anonymous = AuthenticatedUser::new(UserId::new(), email.clone(), None);
        assert_eq!(anonymous.display_name_or_email(), "dev@example.com");

        let named = AuthenticatedUser::new(UserId::new(), email, Some("Dev".into()));
        assert_eq!(named.display_name_or_email(), "Dev");
    }

    #[test]
    fn claim_errors_do_not_force_reauthentication() {
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::InvalidClaim("sub").requires_reauthentication());
    }
}
