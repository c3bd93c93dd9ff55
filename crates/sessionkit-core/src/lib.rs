//! Sessionkit Core - Credential and session lifecycle
//!
//! Issues, verifies, rotates and revokes the credentials of an HTTP API:
//! - Secret hashing (Argon2id)
//! - Signed access and refresh tokens (HS256, one key per purpose)
//! - Single active session per principal, rotated on every refresh
//! - Request authentication from cookie or bearer header
//!
//! The store of principals is external and reached through [`SessionStore`].
//!
//! Author: hephaex@gmail.com

pub mod authenticator;
pub mod config;
pub mod error;
pub mod hasher;
pub mod models;
pub mod session;
pub mod store;
pub mod token;

pub use authenticator::{
    extract_credential, AuthenticatedPrincipal, RequestAuthenticator, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
pub use config::{
    AppConfig, ConfigError, CookieConfig, LoggingConfig, ServerConfig, TokenConfig,
    MAX_TOKEN_TTL_SECS,
};
pub use error::{AuthError, AuthResult, CredentialRejection};
pub use hasher::{validate_secret_strength, verify_secret, HashError, HasherConfig, SecretHasher};
pub use models::{
    CredentialPair, Fingerprint, NewPrincipal, Principal, PrincipalProfile, Registration,
    SessionState,
};
pub use session::SessionManager;
pub use store::{MemoryStore, SessionStore, StoreError, StoreResult};
pub use token::{
    issue_token, verify_token, Claims, ProfileSnapshot, SigningKey, TokenCodec, TokenError,
    TokenPurpose,
};
