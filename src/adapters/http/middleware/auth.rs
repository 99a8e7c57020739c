//! Bearer token authentication.
//!
//! ```text
//! Request → auth_middleware → AuthenticatedUser in extensions
//!                                      ↓
//!                              handler → RequireAuth reads it back
//! ```
//!
//! The middleware is provider-agnostic: it only talks to the
//! `SessionValidator` port. Requests without an `Authorization` header pass
//! through untouched so unauthenticated routes can share the stack;
//! handlers that need a user take `RequireAuth`.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

use crate::adapters::http::error::ErrorBody;

pub type AuthState = Arc<dyn SessionValidator>;

/// Validates `Authorization: Bearer <token>` and injects the user.
///
/// A present but invalid token is rejected with 401 here, before routing.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return next.run(request).await;
    };

    match validator.validate(token).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthRejection::from(e).into_response()
        }
    }
}

/// Extractor for handlers that require an authenticated user.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No token was presented.
    Unauthenticated,
    /// A token was presented and refused.
    Invalid(AuthError),
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        AuthRejection::Invalid(err)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AuthRejection::Unauthenticated => ("UNAUTHENTICATED", "Authentication required".to_string()),
            AuthRejection::Invalid(AuthError::TokenExpired) => ("TOKEN_EXPIRED", "Token expired".to_string()),
            AuthRejection::Invalid(e) => ("UNAUTHORIZED", e.to_string()),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn whoami(RequireAuth(user): RequireAuth) -> String {
        user.email.as_str().to_string()
    }

    async fn open() -> &'static str {
        "open"
    }

    fn app(validator: Arc<MockSessionValidator>) -> Router {
        let state: AuthState = validator;
        Router::new()
            .route("/me", get(whoami))
            .route("/open", get(open))
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    fn request(path: &str, token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let validator = Arc::new(MockSessionValidator::new());
        validator.issue("good", "member@example.com").unwrap();

        let response = app(validator).oneshot(request("/me", Some("good"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"member@example.com");
    }

    #[tokio::test]
    async fn missing_token_is_rejected_only_where_required() {
        let validator = Arc::new(MockSessionValidator::new());

        let protected = app(validator.clone()).oneshot(request("/me", None)).await.unwrap();
        assert_eq!(protected.status(), StatusCode::UNAUTHORIZED);

        let open = app(validator).oneshot(request("/open", None)).await.unwrap();
        assert_eq!(open.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected_before_routing() {
        let validator = Arc::new(MockSessionValidator::new());
        let response = app(validator).oneshot(request("/open", Some("forged"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
