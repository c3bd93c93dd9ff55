//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::metrics::AuthMetrics;
use sessionkit_core::{
    AppConfig, ConfigError, HashError, RequestAuthenticator, SecretHasher, SessionManager,
    SessionStore, TokenCodec,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors raised while wiring the application state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid hasher parameters: {0}")]
    Hasher(#[from] HashError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Login, refresh, logout and password change
    pub sessions: SessionManager,
    /// Access token verification
    pub authenticator: RequestAuthenticator,
    /// Auth outcome and request counters
    pub metrics: AuthMetrics,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Build the state from configuration and a session store
    ///
    /// Fails if the token configuration is incomplete.
    pub fn new(config: AppConfig, store: Arc<dyn SessionStore>) -> Result<Self, StateError> {
        let codec = TokenCodec::new(&config.tokens)?;
        let hasher = SecretHasher::new(&config.hasher)?;

        Ok(Self {
            sessions: SessionManager::new(store.clone(), codec.clone(), hasher),
            authenticator: RequestAuthenticator::new(store, codec),
            metrics: AuthMetrics::new()?,
            config,
            start_time: Instant::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionkit_core::{MemoryStore, TokenConfig};

    #[test]
    fn test_state_requires_token_config() {
        let result = AppState::new(AppConfig::default(), Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(StateError::Config(_))));
    }

    #[test]
    fn test_state_from_valid_config() {
        let config = AppConfig {
            tokens: TokenConfig::new("access", "refresh", 60, 600),
            ..Default::default()
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(state.sessions.codec().access_ttl_secs(), 60);
    }
}
