//! Authentication API handlers
//!
//! Thin adapters between HTTP and [`SessionManager`](sessionkit_core::SessionManager):
//! decode the body, call one lifecycle operation, record its outcome,
//! and set or clear the token cookies.
//!
//! Author: hephaex@gmail.com

use crate::cookies::{cleared_cookies, cookie_value, credential_cookies};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sessionkit_core::{
    AuthError, AuthenticatedPrincipal, CredentialPair, PrincipalProfile, Registration,
    TokenError, REFRESH_TOKEN_COOKIE,
};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Registration {
            username: request.username,
            email: request.email,
            fullname: request.fullname,
            secret: request.password,
            avatar_url: request.avatar_url,
            cover_image_url: request.cover_image_url,
        }
    }
}

/// Login request; `identifier` is a username or an email
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
}

/// Refresh request; the token may come from the `refreshToken` cookie instead
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Issued credential pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

impl From<CredentialPair> for TokenResponse {
    fn from(pair: CredentialPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            refresh_expires_in: pair.refresh_expires_in,
        }
    }
}

/// Public principal profile
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PrincipalProfile> for ProfileResponse {
    fn from(profile: PrincipalProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            email: profile.email,
            fullname: profile.fullname,
            avatar_url: profile.avatar_url,
            cover_image_url: profile.cover_image_url,
            created_at: profile.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Register a new principal
///
/// Does not log in; call `/auth/login` afterwards.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Principal registered", body = ProfileResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Username or email already taken", body = crate::error::ApiError),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let result = state.sessions.register(request.into()).await;
    state.metrics.observe("register", &result);
    let profile = result?;

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

/// Login with username or email and password
///
/// Returns the credential pair in the body and as cookies. Any previous
/// session of the principal is replaced.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 404, description = "Unknown username or email", body = crate::error::ApiError),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let result = state
        .sessions
        .login(&request.identifier, &request.password)
        .await;
    state.metrics.observe("login", &result);
    let pair = result?;

    let cookies = credential_cookies(&pair, &state.config.cookies)?;
    Ok((cookies, Json(TokenResponse::from(pair))))
}

/// Rotate the refresh token
///
/// The presented refresh token is single-use: on success it is replaced
/// and any later attempt with it fails.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body(content = RefreshRequest, description = "Optional when the refreshToken cookie is sent"),
    responses(
        (status = 200, description = "Tokens rotated", body = TokenResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = crate::error::ApiError),
        (status = 503, description = "Store unavailable", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.unwrap_or_default();

    let presented = request
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| cookie_value(&headers, REFRESH_TOKEN_COOKIE))
        .filter(|t| !t.is_empty());

    let result = match presented {
        Some(token) => state.sessions.refresh(&token).await,
        None => Err(AuthError::InvalidRefreshToken(TokenError::MalformedToken)),
    };
    state.metrics.observe("refresh", &result);
    let pair = result?;

    let cookies = credential_cookies(&pair, &state.config.cookies)?;
    Ok((cookies, Json(TokenResponse::from(pair))))
}

/// End the current session
///
/// Clears the session record and both cookies. The access token in hand
/// stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedPrincipal>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.sessions.logout(caller.id()).await;
    state.metrics.observe("logout", &result);
    result?;

    let cookies = cleared_cookies(&state.config.cookies)?;
    Ok((cookies, Json(MessageResponse::new("Logged out successfully"))))
}

/// Change the caller's password
///
/// Revokes the current session; the caller must log in again to obtain a
/// new refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too weak", body = crate::error::ApiError),
        (status = 401, description = "Wrong old password or unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedPrincipal>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    let result = state
        .sessions
        .change_password(caller.id(), &request.old_password, &request.new_password)
        .await;
    state.metrics.observe("change_password", &result);
    result?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current principal", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedPrincipal>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.sessions.profile(caller.id()).await?;
    Ok(Json(ProfileResponse::from(profile)))
}
