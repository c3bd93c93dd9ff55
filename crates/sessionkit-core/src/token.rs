//! Token issuance and verification
//!
//! Tokens are JWTs signed with HMAC-SHA256. Each token purpose (access,
//! refresh) has its own secret, lifetime and audience, so a token minted for
//! one purpose never verifies as the other.

use crate::config::{ConfigError, TokenConfig};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// What a token may be used for; written to the `aud` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Access,
    Refresh,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Access => "access",
            TokenPurpose::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized profile carried by access tokens
///
/// Advisory only: good enough for display, never for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub username: String,
    pub email: String,
    pub fullname: String,
}

/// Claims embedded in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - principal ID
    pub sub: String,
    /// Audience - the token purpose
    pub aud: String,
    /// Unique token identifier
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Profile snapshot, present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSnapshot>,
}

impl Claims {
    /// Principal ID from the `sub` claim
    pub fn principal_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::MalformedToken)
    }
}

/// Token errors
///
/// Every verification failure is a plain value; attacker-controlled input
/// never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),
}

/// Secret, lifetime and audience for one token purpose
#[derive(Clone)]
pub struct SigningKey {
    purpose: TokenPurpose,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl SigningKey {
    pub fn new(purpose: TokenPurpose, secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            purpose,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("purpose", &self.purpose)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::EncodingFailed(e.to_string()))
}

/// Sign a new token for `subject` with the key's lifetime
///
/// `iat` is the current time and `exp` is `iat + ttl`. A random `jti`
/// makes every token unique even when two are minted in the same second.
pub fn issue_token(
    key: &SigningKey,
    issuer: &str,
    subject: Uuid,
    profile: Option<ProfileSnapshot>,
) -> Result<String, TokenError> {
    let now = now_secs()?;
    let exp = now
        .checked_add(key.ttl_secs)
        .ok_or_else(|| TokenError::EncodingFailed(format!("ttl {} overflows exp", key.ttl_secs)))?;

    let claims = Claims {
        iss: issuer.to_string(),
        sub: subject.to_string(),
        aud: key.purpose.as_str().to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp,
        profile,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &key.encoding)
        .map_err(|e| TokenError::EncodingFailed(e.to_string()))
}

/// Verify signature, issuer, audience and expiry of a token
///
/// `leeway_secs` is the only clock skew allowed; pass 0 for none.
pub fn verify_token(
    key: &SigningKey,
    issuer: &str,
    token: &str,
    leeway_secs: u64,
) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = leeway_secs;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[key.purpose.as_str()]);
    validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

    let token_data = decode::<Claims>(token, &key.decoding, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::MalformedToken,
        }
    })?;

    Ok(token_data.claims)
}

/// Access and refresh keys bundled with issuer and leeway
#[derive(Debug, Clone)]
pub struct TokenCodec {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
    leeway_secs: u64,
}

impl TokenCodec {
    /// Build a codec from validated configuration
    pub fn new(config: &TokenConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            access: SigningKey::new(
                TokenPurpose::Access,
                config.access_secret.as_bytes(),
                config.access_ttl_secs,
            ),
            refresh: SigningKey::new(
                TokenPurpose::Refresh,
                config.refresh_secret.as_bytes(),
                config.refresh_ttl_secs,
            ),
            issuer: config.issuer.clone(),
            leeway_secs: config.leeway_secs,
        })
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access.ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh.ttl_secs
    }

    pub fn issue_access(
        &self,
        subject: Uuid,
        profile: ProfileSnapshot,
    ) -> Result<String, TokenError> {
        issue_token(&self.access, &self.issuer, subject, Some(profile))
    }

    pub fn issue_refresh(&self, subject: Uuid) -> Result<String, TokenError> {
        issue_token(&self.refresh, &self.issuer, subject, None)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify_token(&self.access, &self.issuer, token, self.leeway_secs)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify_token(&self.refresh, &self.issuer, token, self.leeway_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(&TokenConfig::new("access-secret", "refresh-secret", 900, 86400)).unwrap()
    }

    fn profile() -> ProfileSnapshot {
        ProfileSnapshot {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            fullname: "Alice Liddell".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let codec = codec();
        let principal_id = Uuid::new_v4();

        let token = codec.issue_access(principal_id, profile()).unwrap();
        let claims = codec.verify_access(&token).unwrap();

        assert_eq!(claims.principal_id().unwrap(), principal_id);
        assert_eq!(claims.aud, "access");
        assert_eq!(claims.iss, "sessionkit");
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(claims.profile, Some(profile()));
    }

    #[test]
    fn test_refresh_token_has_no_profile() {
        let codec = codec();
        let token = codec.issue_refresh(Uuid::new_v4()).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();

        assert_eq!(claims.aud, "refresh");
        assert!(claims.profile.is_none());
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_tokens_are_unique_within_a_second() {
        let codec = codec();
        let principal_id = Uuid::new_v4();

        let first = codec.issue_refresh(principal_id).unwrap();
        let second = codec.issue_refresh(principal_id).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_purposes_do_not_cross_verify() {
        let codec = codec();
        let principal_id = Uuid::new_v4();

        let refresh = codec.issue_refresh(principal_id).unwrap();
        assert_eq!(
            codec.verify_access(&refresh).unwrap_err(),
            TokenError::InvalidSignature
        );

        let access = codec.issue_access(principal_id, profile()).unwrap();
        assert_eq!(
            codec.verify_refresh(&access).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_audience_checked_even_with_same_secret() {
        let access_key = SigningKey::new(TokenPurpose::Access, b"shared", 60);
        let refresh_key = SigningKey::new(TokenPurpose::Refresh, b"shared", 60);

        let token = issue_token(&refresh_key, "sessionkit", Uuid::new_v4(), None).unwrap();
        assert_eq!(
            verify_token(&access_key, "sessionkit", &token, 0).unwrap_err(),
            TokenError::MalformedToken
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let key = SigningKey::new(TokenPurpose::Access, b"secret", 60);
        let token = issue_token(&key, "someone-else", Uuid::new_v4(), None).unwrap();
        assert_eq!(
            verify_token(&key, "sessionkit", &token, 0).unwrap_err(),
            TokenError::MalformedToken
        );
    }

    #[test]
    fn test_wrong_secret() {
        let key1 = SigningKey::new(TokenPurpose::Access, b"secret1", 60);
        let key2 = SigningKey::new(TokenPurpose::Access, b"secret2", 60);

        let token = issue_token(&key1, "sessionkit", Uuid::new_v4(), Some(profile())).unwrap();
        assert_eq!(
            verify_token(&key2, "sessionkit", &token, 0).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_malformed_input() {
        let codec = codec();
        for input in ["", "invalid.token.here", "not-a-jwt", "a.b", "...."] {
            assert_eq!(
                codec.verify_access(input).unwrap_err(),
                TokenError::MalformedToken,
                "input: {input:?}"
            );
        }
    }

    #[test]
    fn test_tampered_payload() {
        let codec = codec();
        let token = codec.issue_access(Uuid::new_v4(), profile()).unwrap();
        let forged = issue_token(
            &SigningKey::new(TokenPurpose::Access, b"attacker", 900),
            "sessionkit",
            Uuid::new_v4(),
            Some(profile()),
        )
        .unwrap();

        // Genuine header and signature around someone else's payload
        let genuine: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", genuine[0], forged_payload, genuine[2]);

        assert_eq!(
            codec.verify_access(&spliced).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_issue_rejects_overflowing_ttl() {
        let key = SigningKey::new(TokenPurpose::Access, b"secret", u64::MAX);
        let result = issue_token(&key, "sessionkit", Uuid::new_v4(), None);

        assert!(matches!(result, Err(TokenError::EncodingFailed(_))));
    }

    #[test]
    fn test_codec_rejects_unbounded_ttl() {
        let config = TokenConfig::new("access-secret", "refresh-secret", u64::MAX, 60);
        assert!(matches!(
            TokenCodec::new(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    fn expired_token(key: &SigningKey, expired_secs_ago: u64) -> String {
        let now = now_secs().unwrap();
        let claims = Claims {
            iss: "sessionkit".to_string(),
            sub: Uuid::new_v4().to_string(),
            aud: key.purpose.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - expired_secs_ago,
            profile: None,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &key.encoding).unwrap()
    }

    #[test]
    fn test_expired_token() {
        let key = SigningKey::new(TokenPurpose::Access, b"secret", 60);
        let token = expired_token(&key, 3600);

        assert_eq!(
            verify_token(&key, "sessionkit", &token, 0).unwrap_err(),
            TokenError::ExpiredToken
        );
    }

    #[test]
    fn test_no_implicit_leeway() {
        let key = SigningKey::new(TokenPurpose::Access, b"secret", 60);
        let token = expired_token(&key, 5);

        assert_eq!(
            verify_token(&key, "sessionkit", &token, 0).unwrap_err(),
            TokenError::ExpiredToken
        );
        // Explicit tolerance is honoured
        assert!(verify_token(&key, "sessionkit", &token, 60).is_ok());
    }

    #[test]
    fn test_codec_rejects_invalid_config() {
        assert!(TokenCodec::new(&TokenConfig::default()).is_err());
    }
}
