//! SessionKit configuration management
//!
//! Configuration is assembled by the process bootstrap from a TOML file
//! and/or environment variables, then handed to component constructors.
//! Nothing in the core reads the environment on its own.

use crate::hasher::HasherConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Token signing keys and lifetimes
    pub tokens: TokenConfig,

    /// Argon2 parameters for secret hashing
    pub hasher: HasherConfig,

    /// Cookie attributes used when tokens travel as cookies
    pub cookies: CookieConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map-backed closure instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Server
        if let Some(host) = lookup("API_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            config.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        // Tokens
        if let Some(secret) = lookup("ACCESS_TOKEN_SECRET") {
            config.tokens.access_secret = secret;
        }
        if let Some(secret) = lookup("REFRESH_TOKEN_SECRET") {
            config.tokens.refresh_secret = secret;
        }
        if let Some(ttl) = lookup("ACCESS_TOKEN_EXPIRY_SECS") {
            config.tokens.access_ttl_secs = parse_value("ACCESS_TOKEN_EXPIRY_SECS", ttl)?;
        }
        if let Some(ttl) = lookup("REFRESH_TOKEN_EXPIRY_SECS") {
            config.tokens.refresh_ttl_secs = parse_value("REFRESH_TOKEN_EXPIRY_SECS", ttl)?;
        }
        if let Some(issuer) = lookup("TOKEN_ISSUER") {
            config.tokens.issuer = issuer;
        }
        if let Some(leeway) = lookup("TOKEN_LEEWAY_SECS") {
            config.tokens.leeway_secs = parse_value("TOKEN_LEEWAY_SECS", leeway)?;
        }

        // Cookies
        if let Some(secure) = lookup("COOKIE_SECURE") {
            config.cookies.secure = parse_value("COOKIE_SECURE", secure)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_override(|key| std::env::var(key).ok())
    }

    /// Merge with values from a key lookup; present keys win
    pub fn with_override<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = Self::from_lookup(&lookup)?;

        if lookup("API_HOST").is_some() {
            self.server.host = overrides.server.host;
        }
        if lookup("API_PORT").is_some() {
            self.server.port = overrides.server.port;
        }
        if lookup("CORS_ORIGINS").is_some() {
            self.server.cors_origins = overrides.server.cors_origins;
        }

        // Always take secrets from the environment when provided
        if lookup("ACCESS_TOKEN_SECRET").is_some() {
            self.tokens.access_secret = overrides.tokens.access_secret;
        }
        if lookup("REFRESH_TOKEN_SECRET").is_some() {
            self.tokens.refresh_secret = overrides.tokens.refresh_secret;
        }
        if lookup("ACCESS_TOKEN_EXPIRY_SECS").is_some() {
            self.tokens.access_ttl_secs = overrides.tokens.access_ttl_secs;
        }
        if lookup("REFRESH_TOKEN_EXPIRY_SECS").is_some() {
            self.tokens.refresh_ttl_secs = overrides.tokens.refresh_ttl_secs;
        }
        if lookup("TOKEN_ISSUER").is_some() {
            self.tokens.issuer = overrides.tokens.issuer;
        }
        if lookup("TOKEN_LEEWAY_SECS").is_some() {
            self.tokens.leeway_secs = overrides.tokens.leeway_secs;
        }
        if lookup("COOKIE_SECURE").is_some() {
            self.cookies.secure = overrides.cookies.secure;
        }
        if lookup("LOG_LEVEL").is_some() {
            self.logging.level = overrides.logging.level;
        }
        if lookup("LOG_FORMAT").is_some() {
            self.logging.json_format = overrides.logging.json_format;
        }

        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Longest token lifetime accepted by [`TokenConfig::validate`] (10 years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Token signing configuration
///
/// Both secrets and both lifetimes are required. `Default` leaves them
/// empty/zero so that a missing value is caught by [`TokenConfig::validate`]
/// instead of silently running with a built-in key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens (must differ from the access secret)
    pub refresh_secret: String,

    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,

    /// `iss` claim written into and required on every token
    pub issuer: String,

    /// Clock skew tolerance applied on verification
    pub leeway_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_secs: 0,
            refresh_ttl_secs: 0,
            issuer: "sessionkit".to_string(),
            leeway_secs: 0,
        }
    }
}

impl TokenConfig {
    /// Build a token configuration with the four required values
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
            ..Default::default()
        }
    }

    /// Check that every required value is present and the two keys differ
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::MissingRequired("ACCESS_TOKEN_SECRET".to_string()));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::MissingRequired("REFRESH_TOKEN_SECRET".to_string()));
        }
        if self.access_ttl_secs == 0 {
            return Err(ConfigError::MissingRequired(
                "ACCESS_TOKEN_EXPIRY_SECS".to_string(),
            ));
        }
        if self.refresh_ttl_secs == 0 {
            return Err(ConfigError::MissingRequired(
                "REFRESH_TOKEN_EXPIRY_SECS".to_string(),
            ));
        }
        for (key, ttl) in [
            ("ACCESS_TOKEN_EXPIRY_SECS", self.access_ttl_secs),
            ("REFRESH_TOKEN_EXPIRY_SECS", self.refresh_ttl_secs),
        ] {
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: ttl.to_string(),
                });
            }
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue {
                key: "REFRESH_TOKEN_SECRET".to_string(),
                value: "<must differ from ACCESS_TOKEN_SECRET>".to_string(),
            });
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TOKEN_ISSUER".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Cookie attributes for token transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Set the Secure flag (disable only for local plain-HTTP development)
    pub secure: bool,

    /// Cookie path
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            path: "/".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tokens.leeway_secs, 0);
        assert!(config.cookies.secure);
    }

    #[test]
    fn test_default_token_config_is_rejected() {
        let result = TokenConfig::default().validate();
        assert!(matches!(result, Err(ConfigError::MissingRequired(key)) if key == "ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn test_token_config_requires_ttls() {
        let config = TokenConfig::new("access", "refresh", 0, 60);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "ACCESS_TOKEN_EXPIRY_SECS"
        ));

        let config = TokenConfig::new("access", "refresh", 60, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "REFRESH_TOKEN_EXPIRY_SECS"
        ));
    }

    #[test]
    fn test_token_config_bounds_ttls() {
        let config = TokenConfig::new("access", "refresh", u64::MAX, 60);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "ACCESS_TOKEN_EXPIRY_SECS"
        ));

        let config = TokenConfig::new("access", "refresh", 60, MAX_TOKEN_TTL_SECS + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "REFRESH_TOKEN_EXPIRY_SECS"
        ));

        let config = TokenConfig::new("access", "refresh", 60, MAX_TOKEN_TTL_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_config_rejects_shared_secret() {
        let config = TokenConfig::new("same", "same", 60, 600);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_PORT", "9090"),
            ("CORS_ORIGINS", "https://app.example.com, ,https://admin.example.com"),
            ("ACCESS_TOKEN_SECRET", "a-secret"),
            ("REFRESH_TOKEN_SECRET", "r-secret"),
            ("ACCESS_TOKEN_EXPIRY_SECS", "900"),
            ("REFRESH_TOKEN_EXPIRY_SECS", "864000"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert_eq!(config.tokens.access_ttl_secs, 900);
        assert_eq!(config.tokens.refresh_ttl_secs, 864000);
        assert!(config.logging.json_format);
        assert!(config.tokens.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let result = AppConfig::from_lookup(lookup_from(&[("ACCESS_TOKEN_EXPIRY_SECS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == "ACCESS_TOKEN_EXPIRY_SECS"
        ));
    }

    #[test]
    fn test_toml_with_override() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 7000

            [tokens]
            access_secret = "file-access"
            refresh_secret = "file-refresh"
            access_ttl_secs = 600
            refresh_ttl_secs = 86400
            "#,
        )
        .unwrap()
        .with_override(lookup_from(&[("ACCESS_TOKEN_SECRET", "env-access")]))
        .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.tokens.access_secret, "env-access");
        assert_eq!(config.tokens.refresh_secret, "file-refresh");
        assert_eq!(config.tokens.issuer, "sessionkit");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = TokenConfig::new("top-secret-access", "top-secret-refresh", 60, 600);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret"));
    }
}
