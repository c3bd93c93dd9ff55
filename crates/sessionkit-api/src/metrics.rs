//! Prometheus metrics
//!
//! Auth outcomes are labelled with [`AuthError::kind`], so a replayed
//! refresh token (`refresh_token_revoked`) is counted apart from an expired
//! one even though both reach the caller as the same 401.
//!
//! Author: hephaex@gmail.com

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use sessionkit_core::AuthError;

/// Metric handles plus the registry they are exported from
#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    auth_outcomes: IntCounterVec,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    uptime: IntGauge,
}

impl AuthMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let auth_outcomes = IntCounterVec::new(
            Opts::new(
                "sessionkit_auth_outcomes_total",
                "Credential operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let http_requests = IntCounterVec::new(
            Opts::new("sessionkit_http_requests_total", "HTTP requests handled"),
            &["method", "endpoint", "status"],
        )?;
        let http_latency = HistogramVec::new(
            HistogramOpts::new(
                "sessionkit_http_request_duration_seconds",
                "HTTP request latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["endpoint"],
        )?;
        let uptime = IntGauge::new("sessionkit_uptime_seconds", "Time since server start")?;

        registry.register(Box::new(auth_outcomes.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        Ok(Self {
            registry,
            auth_outcomes,
            http_requests,
            http_latency,
            uptime,
        })
    }

    pub fn record_success(&self, operation: &str) {
        self.auth_outcomes
            .with_label_values(&[operation, "success"])
            .inc();
    }

    pub fn record_failure(&self, operation: &str, err: &AuthError) {
        self.auth_outcomes
            .with_label_values(&[operation, err.kind()])
            .inc();
    }

    /// Record the result of one operation
    pub fn observe<T>(&self, operation: &str, result: &Result<T, AuthError>) {
        match result {
            Ok(_) => self.record_success(operation),
            Err(e) => self.record_failure(operation, e),
        }
    }

    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, latency_secs: f64) {
        self.http_requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_latency
            .with_label_values(&[endpoint])
            .observe(latency_secs);
    }

    /// Count for one `(operation, outcome)` pair
    pub fn outcome_count(&self, operation: &str, outcome: &str) -> u64 {
        self.auth_outcomes
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self, uptime_secs: u64) -> Result<String, prometheus::Error> {
        self.uptime.set(i64::try_from(uptime_secs).unwrap_or(i64::MAX));

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
