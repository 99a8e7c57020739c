//! API error rendering.
//!
//! Every failure leaves the service as `{"code": "...", "message": "..."}`
//! with the status chosen by the domain error. Server-side failures are
//! logged here and their detail is not echoed to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::billing::{BillingError, WebhookError};
use crate::domain::team::InvitationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let body = ErrorBody {
            code: code.into(),
            message: message.into(),
        };
        if status.is_server_error() {
            tracing::error!(status = %status, code = %body.code, message = %body.message, "request failed");
            return Self {
                status,
                body: ErrorBody {
                    message: "Temporary failure, please retry".to_string(),
                    ..body
                },
            };
        }
        Self { status, body }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.code
    }
}

impl From<InvitationError> for ApiError {
    fn from(err: InvitationError) -> Self {
        Self::new(err.status_code(), err.code().to_string(), err.to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self::new(err.status_code(), err.code().to_string(), err.to_string())
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        let code = match &err {
            e if e.is_unverified() => "INVALID_SIGNATURE",
            WebhookError::ParseError(_) | WebhookError::MissingField(_) => "INVALID_PAYLOAD",
            WebhookError::DataIntegrity(_) => "DATA_INTEGRITY",
            WebhookError::Provider(_) => "PAYMENT_PROVIDER_ERROR",
            _ => "DATABASE_ERROR",
        };
        Self::new(err.status_code(), code, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
