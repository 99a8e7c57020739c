//! Token-table session validator for tests and local development.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Email, UserId};
use crate::ports::SessionValidator;

/// Accepts exactly the tokens it was given. Unknown tokens are `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Registers `token` for a fresh user with the given email and returns that user.
    pub fn issue(&self, token: impl Into<String>, email: &str) -> Result<AuthenticatedUser, AuthError> {
        let email = Email::new(email).map_err(|_| AuthError::InvalidClaim("email"))?;
        let user = AuthenticatedUser::new(UserId::new(), email, None);
        self.add_token(token, user.clone());
        Ok(user)
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }

    pub fn revoke(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_tokens_validate_until_revoked() {
        let validator = MockSessionValidator::new();
        let user = validator.issue("tok-1", "owner@example.com").unwrap();

        assert_eq!(validator.validate("tok-1").await.unwrap(), user);

        validator.revoke("tok-1");
        assert_eq!(validator.validate("tok-1").await.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = MockSessionValidator::new();
        assert_eq!(validator.validate("nope").await.unwrap_err(), AuthError::InvalidToken);
    }
}
