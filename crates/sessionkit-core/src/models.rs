//! Data model for principals, credentials and session records
//!
//! - Principal: an identity read from the external store
//! - CredentialPair: access + refresh tokens, always issued together
//! - Fingerprint: the only form in which a refresh token is stored

use crate::token::ProfileSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Authenticated identity record
///
/// The store owns principals; the core only ever holds a snapshot read for
/// the duration of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Immutable unique identifier
    pub id: Uuid,

    /// Unique username (trimmed, lowercase)
    pub username: String,

    /// Unique email address (trimmed, lowercase)
    pub email: String,

    /// Display name
    pub fullname: String,

    /// Avatar URL returned by the asset store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Cover image URL returned by the asset store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    /// Argon2id PHC digest; never serialized
    #[serde(skip_serializing, default)]
    pub secret_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Profile snapshot embedded in access tokens
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
        }
    }

    /// Public representation without the secret digest
    pub fn to_profile(&self) -> PrincipalProfile {
        PrincipalProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar_url: self.avatar_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            created_at: self.created_at,
        }
    }

    /// True if `identifier` names this principal by username or email
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let identifier = normalize_identifier(identifier);
        self.username == identifier || self.email == identifier
    }
}

/// Public principal representation (safe for API responses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalProfile {
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

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub secret: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

/// A principal ready to be persisted, secret already hashed
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub secret_hash: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
}

impl NewPrincipal {
    /// Materialize with a fresh id and timestamps
    pub fn into_principal(self) -> Principal {
        let now = Utc::now();
        Principal {
            id: Uuid::new_v4(),
            username: normalize_identifier(&self.username),
            email: normalize_identifier(&self.email),
            fullname: self.fullname.trim().to_string(),
            avatar_url: self.avatar_url,
            cover_image_url: self.cover_image_url,
            secret_hash: self.secret_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trim and lowercase a username or email for lookup and storage
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Access and refresh tokens, issued together
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

/// Non-reversible reference to a refresh token
///
/// Lowercase hex SHA-256 of the raw token string. The store only ever sees
/// fingerprints, never refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to correlate log lines, not enough to be useful to anyone else
        let prefix: String = self.0.chars().take(12).collect();
        write!(f, "{prefix}…")
    }
}

/// Session state of one principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active(Fingerprint),
}

impl From<Option<Fingerprint>> for SessionState {
    fn from(record: Option<Fingerprint>) -> Self {
        match record {
            Some(fingerprint) => SessionState::Active(fingerprint),
            None => SessionState::NoSession,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_principal() -> NewPrincipal {
        NewPrincipal {
            username: "  Alice ".to_string(),
            email: "Alice@Example.COM".to_string(),
            fullname: " Alice Liddell ".to_string(),
            secret_hash: "$argon2id$stub".to_string(),
            avatar_url: Some("https://assets.example.com/a.png".to_string()),
            cover_image_url: None,
        }
    }

    #[test]
    fn test_into_principal_normalizes() {
        let principal = new_principal().into_principal();

        assert_eq!(principal.username, "alice");
        assert_eq!(principal.email, "alice@example.com");
        assert_eq!(principal.fullname, "Alice Liddell");
        assert_eq!(principal.created_at, principal.updated_at);
    }

    #[test]
    fn test_matches_identifier() {
        let principal = new_principal().into_principal();

        assert!(principal.matches_identifier("alice"));
        assert!(principal.matches_identifier(" ALICE@example.com "));
        assert!(!principal.matches_identifier("bob"));
    }

    #[test]
    fn test_secret_hash_never_serialized() {
        let principal = new_principal().into_principal();
        let json = serde_json::to_string(&principal).unwrap();

        assert!(!json.contains("secret_hash"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_fingerprint_is_stable_sha256() {
        let fp = Fingerprint::of("token");
        assert_eq!(fp, Fingerprint::of("token"));
        assert_ne!(fp, Fingerprint::of("token2"));
        assert_eq!(fp.as_str().len(), 64);
        assert_eq!(
            fp.as_str(),
            "3c469e9d6c5875d37a43f353d4f88e61fcf812c66eee3457465a40b0da4153e0"
        );
    }

    #[test]
    fn test_session_state_from_record() {
        assert_eq!(SessionState::from(None), SessionState::NoSession);
        let fp = Fingerprint::of("t");
        assert_eq!(
            SessionState::from(Some(fp.clone())),
            SessionState::Active(fp)
        );
    }

    #[test]
    fn test_credential_pair_debug_hides_tokens() {
        let pair = CredentialPair {
            access_token: "access-value".to_string(),
            refresh_token: "refresh-value".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
            refresh_expires_in: 86400,
        };
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("access-value"));
        assert!(!rendered.contains("refresh-value"));
    }
}
