//! Shared-secret JWT validation.
//!
//! Tokens are issued by the identity service and signed with HS256. The
//! validator checks signature, issuer, audience and expiry, then turns the
//! claims into an [`AuthenticatedUser`]. Handlers never see raw claims.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, Email, UserId};
use crate::ports::SessionValidator;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    /// Seconds of clock skew tolerated on `exp`.
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: SecretString, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_secs: 30,
        }
    }

    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }
}

/// Claims carried by session tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id (UUID).
    pub sub: String,
    pub iss: String,
    #[serde(default)]
    pub aud: Audience,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `aud` may be a single string or an array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == expected,
            Audience::Multiple(v) => v.iter().any(|s| s == expected),
        }
    }
}

pub struct JwtSessionValidator {
    config: JwtConfig,
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(config: JwtConfig) -> Self {
        let key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
        validation.leeway = config.leeway_secs;

        Self {
            config,
            key,
            validation,
        }
    }

    fn into_user(&self, claims: SessionClaims) -> Result<AuthenticatedUser, AuthError> {
        if !claims.aud.contains(&self.config.audience) {
            tracing::warn!(audience = ?claims.aud, "audience mismatch after decode");
            return Err(AuthError::InvalidToken);
        }

        let id: UserId = claims.sub.parse().map_err(|_| {
            tracing::warn!(sub = %claims.sub, "subject is not a user id");
            AuthError::InvalidClaim("sub")
        })?;

        let email = claims
            .email
            .as_deref()
            .ok_or(AuthError::InvalidClaim("email"))
            .and_then(|raw| Email::new(raw).map_err(|_| AuthError::InvalidClaim("email")))?;

        Ok(AuthenticatedUser::new(id, email, claims.name))
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "token issued for another party");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        self.into_user(data.claims)
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

/// Signs a session token. Used by local tooling and tests.
pub fn issue_token(
    secret: &str,
    claims: &SessionClaims,
) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}
