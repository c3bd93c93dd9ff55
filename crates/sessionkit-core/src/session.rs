//! Session manager
//!
//! Orchestrates registration, login, refresh rotation, logout and password
//! change. Each principal is either in `NoSession` or `Active(fingerprint)`;
//! the fingerprint names the single refresh token currently accepted.

use crate::error::{AuthError, AuthResult};
use crate::hasher::{validate_secret_strength, SecretHasher};
use crate::models::{
    normalize_identifier, CredentialPair, Fingerprint, NewPrincipal, Principal, PrincipalProfile,
    Registration, SessionState,
};
use crate::store::{SessionStore, StoreError};
use crate::token::TokenCodec;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session lifecycle service
///
/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: TokenCodec,
    hasher: SecretHasher,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: TokenCodec, hasher: SecretHasher) -> Self {
        Self {
            store,
            codec,
            hasher,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new principal
    ///
    /// Does not open a session; the caller logs in afterwards.
    pub async fn register(&self, registration: Registration) -> AuthResult<PrincipalProfile> {
        let required = [
            &registration.username,
            &registration.email,
            &registration.fullname,
            &registration.secret,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let email = normalize_identifier(&registration.email);
        if !email.contains('@') {
            return Err(AuthError::Validation("Invalid email format".to_string()));
        }

        validate_secret_strength(&registration.secret)
            .map_err(|e| AuthError::Validation(format!("Password validation failed: {e}")))?;

        let secret_hash = self.hasher.hash(&registration.secret)?;

        let principal = self
            .store
            .create(NewPrincipal {
                username: registration.username,
                email,
                fullname: registration.fullname,
                secret_hash,
                avatar_url: registration.avatar_url,
                cover_image_url: registration.cover_image_url,
            })
            .await?;

        info!(principal_id = %principal.id, username = %principal.username, "principal registered");
        Ok(principal.to_profile())
    }

    /// Authenticate by username or email and open a fresh session
    ///
    /// Any previous session of the principal is replaced.
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<CredentialPair> {
        let principal = self
            .store
            .find_by_username_or_email(identifier)
            .await
            .map_err(|e| {
                if e == StoreError::NotFound {
                    debug!("login for unknown identifier");
                }
                AuthError::from(e)
            })?;

        if !self.hasher.verify(secret, &principal.secret_hash) {
            info!(principal_id = %principal.id, "login rejected: invalid credential");
            return Err(AuthError::InvalidCredential);
        }

        let (pair, fingerprint) = self.mint(&principal)?;
        self.store
            .set_session_fingerprint(principal.id, Some(fingerprint.clone()))
            .await?;

        info!(principal_id = %principal.id, session = %fingerprint, "login succeeded");
        Ok(pair)
    }

    /// Exchange a refresh token for a new credential pair
    ///
    /// The presented token must be the one currently on record. On success
    /// it is rotated out and can never be used again.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<CredentialPair> {
        let claims = self
            .codec
            .verify_refresh(refresh_token)
            .map_err(|e| {
                debug!(error = %e, "refresh token failed verification");
                AuthError::InvalidRefreshToken(e)
            })?;
        let principal_id = claims.principal_id().map_err(AuthError::InvalidRefreshToken)?;

        let principal = self
            .store
            .find_by_id(principal_id)
            .await
            .map_err(|e| unknown_principal(e, principal_id))?;

        let presented = Fingerprint::of(refresh_token);
        let current = self
            .store
            .get_session_fingerprint(principal_id)
            .await
            .map_err(|e| unknown_principal(e, principal_id))?;

        if current.as_ref() != Some(&presented) {
            warn!(
                principal_id = %principal_id,
                presented = %presented,
                state = ?SessionState::from(current),
                "refresh token reuse detected"
            );
            return Err(AuthError::RefreshTokenRevoked);
        }

        // Everything local is computed before the store is touched
        let (pair, next) = self.mint(&principal)?;

        let rotated = self
            .store
            .compare_and_set_session_fingerprint(principal_id, &presented, Some(next.clone()))
            .await
            .map_err(|e| unknown_principal(e, principal_id))?;

        if !rotated {
            warn!(
                principal_id = %principal_id,
                presented = %presented,
                "refresh token reuse detected: lost rotation race"
            );
            return Err(AuthError::RefreshTokenRevoked);
        }

        info!(principal_id = %principal_id, session = %next, "session rotated");
        Ok(pair)
    }

    /// End the principal's session
    ///
    /// Idempotent: logging out without a session, or for a principal that
    /// no longer exists, succeeds.
    pub async fn logout(&self, principal_id: Uuid) -> AuthResult<()> {
        match self.store.set_session_fingerprint(principal_id, None).await {
            Ok(()) => {
                info!(principal_id = %principal_id, "session cleared");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                debug!(principal_id = %principal_id, "logout for unknown principal");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the principal's secret and revoke its session
    pub async fn change_password(
        &self,
        principal_id: Uuid,
        old_secret: &str,
        new_secret: &str,
    ) -> AuthResult<()> {
        let principal = self.store.find_by_id(principal_id).await?;

        if !self.hasher.verify(old_secret, &principal.secret_hash) {
            info!(principal_id = %principal_id, "password change rejected: invalid credential");
            return Err(AuthError::InvalidCredential);
        }

        validate_secret_strength(new_secret)
            .map_err(|e| AuthError::Validation(format!("Password validation failed: {e}")))?;

        let secret_hash = self.hasher.hash(new_secret)?;
        self.store
            .update_secret_hash(principal_id, &secret_hash)
            .await?;

        // Outstanding refresh tokens die with the old secret
        self.store
            .set_session_fingerprint(principal_id, None)
            .await
            .map_err(|e| {
                warn!(principal_id = %principal_id, error = %e, "secret changed but session not cleared");
                AuthError::from(e)
            })?;

        info!(principal_id = %principal_id, "password changed, session cleared");
        Ok(())
    }

    /// Current public profile of a principal
    pub async fn profile(&self, principal_id: Uuid) -> AuthResult<PrincipalProfile> {
        let principal = self.store.find_by_id(principal_id).await?;
        Ok(principal.to_profile())
    }

    /// Current session state of a principal
    pub async fn session_state(&self, principal_id: Uuid) -> AuthResult<SessionState> {
        let record = self.store.get_session_fingerprint(principal_id).await?;
        Ok(SessionState::from(record))
    }

    fn mint(&self, principal: &Principal) -> AuthResult<(CredentialPair, Fingerprint)> {
        let access_token = self.codec.issue_access(principal.id, principal.snapshot())?;
        let refresh_token = self.codec.issue_refresh(principal.id)?;
        let fingerprint = Fingerprint::of(&refresh_token);

        let pair = CredentialPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.access_ttl_secs(),
            refresh_expires_in: self.codec.refresh_ttl_secs(),
        };
        Ok((pair, fingerprint))
    }
}

fn unknown_principal(err: StoreError, principal_id: Uuid) -> AuthError {
    match err {
        StoreError::NotFound => {
            warn!(principal_id = %principal_id, "refresh token for unknown principal");
            AuthError::UnknownPrincipal
        }
        other => other.into(),
    }
}
