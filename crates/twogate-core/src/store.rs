//! Credential store abstraction.
//!
//! All operations are async. Implementations own email uniqueness and
//! optimistic-concurrency enforcement; callers treat the store as the
//! single source of truth for identity records.

use uuid::Uuid;

use crate::error::TwogateResult;
use crate::models::identity::{Identity, NewIdentity};

pub trait CredentialStore: Send + Sync {
    /// Case-insensitive lookup by email address.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = TwogateResult<Option<Identity>>> + Send;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = TwogateResult<Option<Identity>>> + Send;

    /// Inserts a new identity. Fails with [`TwogateError::DuplicateEmail`]
    /// when the address is already taken (case-insensitively), so racing
    /// registrations resolve to exactly one winner.
    ///
    /// [`TwogateError::DuplicateEmail`]: crate::error::TwogateError::DuplicateEmail
    fn create(&self, draft: NewIdentity) -> impl Future<Output = TwogateResult<Identity>> + Send;

    /// Persists a modified identity snapshot. The snapshot's revision must
    /// match the stored one; a stale snapshot fails with
    /// [`TwogateError::Conflict`] and leaves the record untouched.
    ///
    /// [`TwogateError::Conflict`]: crate::error::TwogateError::Conflict
    fn save(&self, identity: Identity) -> impl Future<Output = TwogateResult<Identity>> + Send;

    fn list(&self) -> impl Future<Output = TwogateResult<Vec<Identity>>> + Send;
}
