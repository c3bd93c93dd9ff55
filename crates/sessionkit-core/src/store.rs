//! Session store contract and in-memory implementation
//!
//! The user-record store lives outside the core. `SessionStore` is the
//! narrow contract the core needs from it: principal lookup, principal
//! creation, secret replacement, and the per-principal session record.
//!
//! Writes to the session record of one principal must be linearizable.
//! Rotation goes through `compare_and_set_session_fingerprint`, which only
//! writes when the stored value still equals the one the caller read.

use crate::models::{normalize_identifier, Fingerprint, NewPrincipal, Principal};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read/write contract against the external user record
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Find a principal by id
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Principal>;

    /// Find a principal by username or email (case-insensitive)
    async fn find_by_username_or_email(&self, identifier: &str) -> StoreResult<Principal>;

    /// Persist a new principal; duplicate username or email is a conflict
    async fn create(&self, principal: NewPrincipal) -> StoreResult<Principal>;

    /// Replace the stored secret digest
    async fn update_secret_hash(&self, id: Uuid, secret_hash: &str) -> StoreResult<()>;

    /// Current session fingerprint, `None` when no session is active
    async fn get_session_fingerprint(&self, id: Uuid) -> StoreResult<Option<Fingerprint>>;

    /// Unconditionally overwrite the session record
    async fn set_session_fingerprint(
        &self,
        id: Uuid,
        fingerprint: Option<Fingerprint>,
    ) -> StoreResult<()>;

    /// Overwrite the session record only if it still equals `expected`
    ///
    /// Returns `Ok(false)` when another writer got there first.
    async fn compare_and_set_session_fingerprint(
        &self,
        id: Uuid,
        expected: &Fingerprint,
        new: Option<Fingerprint>,
    ) -> StoreResult<bool>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
struct Record {
    principal: Principal,
    session: Option<Fingerprint>,
}

/// In-memory session store
///
/// Every mutation takes the write lock, so the compare and the write of a
/// CAS happen atomically with respect to every other writer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed principal, bypassing conflict checks
    ///
    /// Used to seed fixtures; the principal starts with no session.
    pub async fn insert(&self, principal: Principal) {
        self.records.write().await.insert(
            principal.id,
            Record {
                principal,
                session: None,
            },
        );
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Principal> {
        self.records
            .read()
            .await
            .get(&id)
            .map(|record| record.principal.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> StoreResult<Principal> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() {
            return Err(StoreError::NotFound);
        }

        self.records
            .read()
            .await
            .values()
            .find(|record| record.principal.matches_identifier(&identifier))
            .map(|record| record.principal.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, principal: NewPrincipal) -> StoreResult<Principal> {
        let principal = principal.into_principal();
        let mut records = self.records.write().await;

        let duplicate = records.values().any(|record| {
            record.principal.username == principal.username
                || record.principal.email == principal.email
        });
        if duplicate {
            return Err(StoreError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        records.insert(
            principal.id,
            Record {
                principal: principal.clone(),
                session: None,
            },
        );
        Ok(principal)
    }

    async fn update_secret_hash(&self, id: Uuid, secret_hash: &str) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.principal.secret_hash = secret_hash.to_string();
        record.principal.updated_at = Utc::now();
        Ok(())
    }

    async fn get_session_fingerprint(&self, id: Uuid) -> StoreResult<Option<Fingerprint>> {
        self.records
            .read()
            .await
            .get(&id)
            .map(|record| record.session.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn set_session_fingerprint(
        &self,
        id: Uuid,
        fingerprint: Option<Fingerprint>,
    ) -> StoreResult<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.session = fingerprint;
        Ok(())
    }

    async fn compare_and_set_session_fingerprint(
        &self,
        id: Uuid,
        expected: &Fingerprint,
        new: Option<Fingerprint>,
    ) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound)?;

        if record.session.as_ref() != Some(expected) {
            return Ok(false);
        }
        record.session = new;
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
