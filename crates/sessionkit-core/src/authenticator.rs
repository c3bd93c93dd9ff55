/// Request authentication
///
/// Verifies an access token and resolves the principal it names. Access
/// tokens are stateless: there is no session check here, so a token stays
/// usable until it expires even after logout.
use crate::error::{AuthError, AuthResult, CredentialRejection};
use crate::models::Principal;
use crate::store::{SessionStore, StoreError};
use crate::token::{Claims, TokenCodec};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Cookie that carries the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie that carries the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// A verified caller
///
/// `principal` is the current store record and is what authorization
/// decisions must use. `claims` is whatever the token said at issuance and
/// is only fit for display.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    pub claims: Claims,
}

impl AuthenticatedPrincipal {
    pub fn id(&self) -> Uuid {
        self.principal.id
    }
}

/// Pick the credential from whichever transport carried it
///
/// The cookie wins over the `Authorization: Bearer` header. Blank values
/// count as absent.
pub fn extract_credential<'a>(
    cookie: Option<&'a str>,
    authorization: Option<&'a str>,
) -> Option<&'a str> {
    let from_cookie = cookie.map(str::trim).filter(|t| !t.is_empty());

    from_cookie.or_else(|| {
        authorization
            .and_then(|h| h.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// Access token verifier
#[derive(Clone)]
pub struct RequestAuthenticator {
    store: Arc<dyn SessionStore>,
    codec: TokenCodec,
}

impl RequestAuthenticator {
    pub fn new(store: Arc<dyn SessionStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    /// Verify an access token and load the principal it names
    pub async fn authenticate(&self, access_token: &str) -> AuthResult<AuthenticatedPrincipal> {
        let claims = self.codec.verify_access(access_token).map_err(|e| {
            debug!(error = %e, "access token rejected");
            AuthError::Unauthenticated(CredentialRejection::Token(e))
        })?;

        let principal_id = claims
            .principal_id()
            .map_err(|e| AuthError::Unauthenticated(CredentialRejection::Token(e)))?;

        let principal = match self.store.find_by_id(principal_id).await {
            Ok(principal) => principal,
            Err(StoreError::NotFound) => {
                debug!(principal_id = %principal_id, "access token for unknown principal");
                return Err(AuthError::Unauthenticated(
                    CredentialRejection::UnknownPrincipal,
                ));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(AuthenticatedPrincipal { principal, claims })
    }

    /// Authenticate using whichever of cookie or header is present
    pub async fn authenticate_transport(
        &self,
        cookie: Option<&str>,
        authorization: Option<&str>,
    ) -> AuthResult<AuthenticatedPrincipal> {
        let token = extract_credential(cookie, authorization)
            .ok_or(AuthError::Unauthenticated(CredentialRejection::Missing))?;
        self.authenticate(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::models::NewPrincipal;
    use crate::store::MemoryStore;
    use crate::token::{ProfileSnapshot, TokenError};

    #[test]
    fn test_extract_prefers_cookie() {
        assert_eq!(
            extract_credential(Some("from-cookie"), Some("Bearer from-header")),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_extract_falls_back_to_header() {
        assert_eq!(
            extract_credential(None, Some("Bearer from-header")),
            Some("from-header")
        );
        assert_eq!(
            extract_credential(Some("   "), Some("Bearer from-header")),
            Some("from-header")
        );
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert_eq!(extract_credential(None, Some("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_credential(None, Some("Bearer ")), None);
        assert_eq!(extract_credential(None, None), None);
    }

    async fn setup() -> (RequestAuthenticator, TokenCodec, Principal) {
        let store = Arc::new(MemoryStore::new());
        let principal = store
            .create(NewPrincipal {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                fullname: "Alice".to_string(),
                secret_hash: String::new(),
                avatar_url: None,
                cover_image_url: None,
            })
            .await
            .unwrap();
        let codec =
            TokenCodec::new(&TokenConfig::new("access-secret", "refresh-secret", 900, 86400))
                .unwrap();
        (
            RequestAuthenticator::new(store, codec.clone()),
            codec,
            principal,
        )
    }

    #[tokio::test]
    async fn test_authenticate_returns_current_record() {
        let (authenticator, codec, principal) = setup().await;

        // Snapshot deliberately stale
        let token = codec
            .issue_access(
                principal.id,
                ProfileSnapshot {
                    username: "old-name".to_string(),
                    email: "old@example.com".to_string(),
                    fullname: "Old".to_string(),
                },
            )
            .unwrap();

        let authenticated = authenticator.authenticate(&token).await.unwrap();
        assert_eq!(authenticated.id(), principal.id);
        assert_eq!(authenticated.principal.username, "alice");
        assert_eq!(
            authenticated.claims.profile.unwrap().username,
            "old-name"
        );
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let (authenticator, codec, principal) = setup().await;
        let token = codec.issue_refresh(principal.id).unwrap();

        let err = authenticator.authenticate(&token).await.unwrap_err();
        assert_eq!(err.token_error(), Some(&TokenError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_unknown_principal() {
        let (authenticator, codec, principal) = setup().await;
        let token = codec.issue_access(Uuid::new_v4(), principal.snapshot()).unwrap();

        let err = authenticator.authenticate(&token).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Unauthenticated(CredentialRejection::UnknownPrincipal)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_transport() {
        let (authenticator, codec, principal) = setup().await;
        let token = codec.issue_access(principal.id, principal.snapshot()).unwrap();
        let header = format!("Bearer {token}");

        let via_header = authenticator
            .authenticate_transport(None, Some(&header))
            .await
            .unwrap();
        assert_eq!(via_header.id(), principal.id);

        let via_cookie = authenticator
            .authenticate_transport(Some(&token), None)
            .await
            .unwrap();
        assert_eq!(via_cookie.id(), principal.id);

        let missing = authenticator.authenticate_transport(None, None).await;
        assert!(matches!(
            missing,
            Err(AuthError::Unauthenticated(CredentialRejection::Missing))
        ));
    }
}
