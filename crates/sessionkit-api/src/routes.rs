//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{auth, health};
use crate::middleware::auth_middleware;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler));

    // Protected routes (access token required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/change-password", post(auth::change_password_handler))
        .route("/auth/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Operational routes outside the versioned API
pub fn ops_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::prometheus_metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::logout_handler,
        auth::change_password_handler,
        auth::me_handler,
        health::health_check
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::ChangePasswordRequest,
            auth::TokenResponse,
            auth::ProfileResponse,
            auth::MessageResponse,
            health::HealthResponse,
            crate::error::ApiError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Credential and session lifecycle"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
