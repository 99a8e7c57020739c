//! Session validation port.
//!
//! Turns a raw bearer token into an [`AuthenticatedUser`]. Implementations
//! must check signature, issuer, audience and expiry.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validates `token` (without the `Bearer ` prefix).
    ///
    /// * `Err(AuthError::InvalidToken)` - malformed or bad signature
    /// * `Err(AuthError::TokenExpired)` - signature valid but expired
    /// * `Err(AuthError::InvalidClaim)` - a claim is not a valid domain value
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Email, UserId};
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct TestSessionValidator {
        tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    }

    #[async_trait]
    impl SessionValidator for TestSessionValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.tokens
                .read()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidToken)
        }
    }

    #[tokio::test]
    async fn returns_user_for_known_token() {
        let user = AuthenticatedUser::new(UserId::new(), Email::new("a@example.com").unwrap(), None);
        let validator = TestSessionValidator {
            tokens: RwLock::new(HashMap::from([("tok".to_string(), user.clone())])),
        };

        assert_eq!(validator.validate("tok").await.unwrap(), user);
        assert_eq!(validator.validate("nope").await.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
