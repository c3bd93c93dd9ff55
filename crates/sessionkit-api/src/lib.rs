//! Sessionkit API - HTTP surface for the session core
//!
//! Wires [`sessionkit_core`] to axum routes: token transport over cookies
//! or the `Authorization` header, JSON error bodies, security headers,
//! request tracing and Prometheus metrics. No lifecycle logic lives here.
//!
//! Author: hephaex@gmail.com

pub mod cookies;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Largest accepted request body; credential payloads are tiny
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::ops_routes())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    let router = match cors_layer(&state.config.server.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

/// Credentialed CORS for the configured origins; none configured, no CORS
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}
