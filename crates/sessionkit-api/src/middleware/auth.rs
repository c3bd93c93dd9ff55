/// Authentication middleware for protecting routes
///
/// Reads the access token from the `accessToken` cookie or, failing that,
/// the `Authorization: Bearer` header. On success the verified
/// [`AuthenticatedPrincipal`] is added to request extensions.
use crate::cookies::cookie_value;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sessionkit_core::{AuthenticatedPrincipal, ACCESS_TOKEN_COOKIE};
use std::sync::Arc;

/// Authentication middleware that requires a valid access token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use sessionkit_api::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
///
/// In handlers, extract the principal:
///
/// ```ignore
/// use axum::Extension;
/// use sessionkit_core::AuthenticatedPrincipal;
///
/// async fn protected_handler(
///     Extension(caller): Extension<AuthenticatedPrincipal>
/// ) -> String {
///     format!("Hello, {}!", caller.principal.fullname)
/// }
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie = cookie_value(request.headers(), ACCESS_TOKEN_COOKIE);
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let result = state
        .authenticator
        .authenticate_transport(cookie.as_deref(), authorization.as_deref())
        .await;
    state.metrics.observe("authenticate", &result);

    let caller: AuthenticatedPrincipal = result?;
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
