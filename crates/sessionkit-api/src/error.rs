//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sessionkit_core::AuthError;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Any failure from the session core
    Auth(AuthError),
    /// Request body could not be decoded
    BadRequest(String),
    PayloadTooLarge,
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => auth_status(err),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredential
        | AuthError::UnknownPrincipal
        | AuthError::InvalidRefreshToken(_)
        | AuthError::RefreshTokenRevoked
        | AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match self {
            AppError::Auth(err) => {
                if status.is_server_error() {
                    tracing::error!(kind = err.kind(), error = %err, "request failed");
                } else {
                    tracing::debug!(kind = err.kind(), error = %err, "request rejected");
                }
                ApiError::new(err.code(), err.public_message())
            }
            AppError::BadRequest(detail) => {
                ApiError::bad_request("Invalid request body").with_details(detail)
            }
            AppError::PayloadTooLarge => {
                ApiError::new("PAYLOAD_TOO_LARGE", "Request body too large")
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                ApiError::internal_error()
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionkit_core::{CredentialRejection, TokenError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (AuthError::NotFound, StatusCode::NOT_FOUND),
            (AuthError::RefreshTokenRevoked, StatusCode::UNAUTHORIZED),
            (
                AuthError::Unauthenticated(CredentialRejection::Token(TokenError::ExpiredToken)),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AuthError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                AuthError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_internal_detail_not_leaked() {
        let response =
            AppError::from(AuthError::StoreUnavailable("10.0.0.5:5432 refused".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "SERVICE_UNAVAILABLE");
        assert!(!error.message.contains("10.0.0.5"));
    }
}
