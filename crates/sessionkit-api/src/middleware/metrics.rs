//! Metrics tracking middleware
//!
//! Records request count and latency per route for Prometheus.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
///
/// Labels by route template rather than raw path, so unknown paths all
/// land in one `unmatched` series.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let endpoint = endpoint_label(request.extensions().get::<MatchedPath>());

    let response = next.run(request).await;

    state.metrics.record_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

fn endpoint_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string())
}
