//! In-memory implementation of [`CredentialStore`].
//!
//! Clones share the underlying map, so a handle kept by a caller
//! observes writes made through any other clone. Concurrent saves are
//! arbitrated by the per-identity revision counter: the first writer
//! wins and a stale snapshot is rejected.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use twogate_core::error::{TwogateError, TwogateResult};
use twogate_core::models::identity::{Identity, NewIdentity, normalize_email};
use twogate_core::store::CredentialStore;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    identities: Arc<RwLock<HashMap<Uuid, Identity>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> TwogateError {
    TwogateError::Internal("credential store lock poisoned".into())
}

impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> TwogateResult<Option<Identity>> {
        let needle = normalize_email(email);
        let map = self.identities.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .find(|identity| identity.email == needle)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> TwogateResult<Option<Identity>> {
        let map = self.identities.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn create(&self, draft: NewIdentity) -> TwogateResult<Identity> {
        let email = normalize_email(&draft.email);
        let mut map = self.identities.write().map_err(|_| poisoned())?;
        if map.values().any(|existing| existing.email == email) {
            return Err(TwogateError::DuplicateEmail);
        }
        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            email,
            password_hash: draft.password_hash,
            phone_number: draft.phone_number,
            role: draft.role,
            totp_secret: None,
            totp_enabled: false,
            sms_factor_enabled: false,
            email_factor_enabled: false,
            pending_code: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        };
        map.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn save(&self, mut identity: Identity) -> TwogateResult<Identity> {
        let mut map = self.identities.write().map_err(|_| poisoned())?;
        let Some(stored) = map.get(&identity.id) else {
            return Err(TwogateError::NotFound {
                entity: "identity".into(),
                id: identity.id.to_string(),
            });
        };
        if stored.revision != identity.revision {
            return Err(TwogateError::Conflict {
                entity: "identity".into(),
                id: identity.id.to_string(),
            });
        }
        identity.revision += 1;
        identity.updated_at = Utc::now();
        map.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn list(&self) -> TwogateResult<Vec<Identity>> {
        let map = self.identities.read().map_err(|_| poisoned())?;
        let mut all: Vec<Identity> = map.values().cloned().collect();
        all.sort_by_key(|identity| identity.created_at);
        Ok(all)
    }
}
