//! Error taxonomy for session operations
//!
//! Internally every failure keeps its precise cause (expired vs bad
//! signature, revoked vs invalid). `code()` and `public_message()` collapse
//! them into the coarse, stable form shown to callers.

use crate::hasher::HashError;
use crate::store::StoreError;
use crate::token::TokenError;
use thiserror::Error;

/// Why a presented access credential was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialRejection {
    #[error("no credential presented")]
    Missing,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("principal no longer exists")]
    UnknownPrincipal,
}

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredential,

    #[error("Principal not found")]
    NotFound,

    #[error("Token refers to an unknown principal")]
    UnknownPrincipal,

    #[error("Invalid refresh token: {0}")]
    InvalidRefreshToken(#[source] TokenError),

    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(#[source] CredentialRejection),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Stable public error code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential => "INVALID_CREDENTIALS",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::UnknownPrincipal
            | AuthError::InvalidRefreshToken(_)
            | AuthError::RefreshTokenRevoked
            | AuthError::Unauthenticated(_) => "UNAUTHORIZED",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::StoreUnavailable(_) => "SERVICE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to callers
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredential => "Invalid username or password".to_string(),
            AuthError::NotFound => "User does not exist".to_string(),
            AuthError::UnknownPrincipal
            | AuthError::InvalidRefreshToken(_)
            | AuthError::RefreshTokenRevoked => "Invalid or expired refresh token".to_string(),
            AuthError::Unauthenticated(_) => "Invalid or expired access token".to_string(),
            AuthError::Validation(msg) | AuthError::Conflict(msg) => msg.clone(),
            AuthError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Fine-grained label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::NotFound => "not_found",
            AuthError::UnknownPrincipal => "unknown_principal",
            AuthError::InvalidRefreshToken(TokenError::ExpiredToken) => "refresh_token_expired",
            AuthError::InvalidRefreshToken(_) => "invalid_refresh_token",
            AuthError::RefreshTokenRevoked => "refresh_token_revoked",
            AuthError::Unauthenticated(CredentialRejection::Missing) => "missing_credential",
            AuthError::Unauthenticated(CredentialRejection::Token(TokenError::ExpiredToken)) => {
                "access_token_expired"
            }
            AuthError::Unauthenticated(CredentialRejection::Token(_)) => "invalid_access_token",
            AuthError::Unauthenticated(CredentialRejection::UnknownPrincipal) => {
                "unknown_principal"
            }
            AuthError::Validation(_) => "validation",
            AuthError::Conflict(_) => "conflict",
            AuthError::StoreUnavailable(_) => "store_unavailable",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Underlying token failure, if any
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            AuthError::InvalidRefreshToken(e) => Some(e),
            AuthError::Unauthenticated(CredentialRejection::Token(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
