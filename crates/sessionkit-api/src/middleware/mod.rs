//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod metrics;
pub mod security_headers;

pub use auth::auth_middleware;
pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;
