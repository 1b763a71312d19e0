//! Contract tests for the in-memory credential store.

use twogate_core::error::TwogateError;
use twogate_core::models::identity::{NewIdentity, PendingCode, Role};
use twogate_core::store::CredentialStore;
use twogate_store::MemoryCredentialStore;

fn draft(email: &str) -> NewIdentity {
    NewIdentity {
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        phone_number: None,
        role: Role::User,
    }
}

#[tokio::test]
async fn create_assigns_id_and_normalizes_email() {
    let store = MemoryCredentialStore::new();

    let identity = store.create(draft("  Alice@Example.COM ")).await.unwrap();

    assert_eq!(identity.email, "alice@example.com");
    assert_eq!(identity.role, Role::User);
    assert_eq!(identity.revision, 0);
    assert!(!identity.totp_enabled);
    assert!(identity.totp_secret.is_none());
    assert!(identity.pending_code.is_none());
}

#[tokio::test]
async fn find_by_email_is_case_insensitive() {
    let store = MemoryCredentialStore::new();
    let created = store.create(draft("bob@example.com")).await.unwrap();

    let fetched = store.find_by_email("BOB@Example.Com").await.unwrap();
    assert_eq!(fetched.map(|identity| identity.id), Some(created.id));

    let missing = store.find_by_email("nobody@example.com").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn find_by_id_roundtrip() {
    let store = MemoryCredentialStore::new();
    let created = store.create(draft("carol@example.com")).await.unwrap();

    let fetched = store.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.email, "carol@example.com");

    let missing = store.find_by_id(uuid::Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn duplicate_email_rejected_case_insensitively() {
    let store = MemoryCredentialStore::new();
    store.create(draft("dave@example.com")).await.unwrap();

    let result = store.create(draft("DAVE@EXAMPLE.COM")).await;
    assert!(matches!(result, Err(TwogateError::DuplicateEmail)));

    // The original record is untouched.
    let all = store.list().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn save_bumps_revision() {
    let store = MemoryCredentialStore::new();
    let mut identity = store.create(draft("eve@example.com")).await.unwrap();

    identity.email_factor_enabled = true;
    let saved = store.save(identity).await.unwrap();

    assert_eq!(saved.revision, 1);
    assert!(saved.email_factor_enabled);
    assert!(saved.updated_at >= saved.created_at);

    let fetched = store.find_by_id(saved.id).await.unwrap().unwrap();
    assert!(fetched.email_factor_enabled);
}

#[tokio::test]
async fn stale_snapshot_loses_the_race() {
    let store = MemoryCredentialStore::new();
    let created = store.create(draft("frank@example.com")).await.unwrap();

    // Two readers fetch the same revision.
    let mut first = store.find_by_id(created.id).await.unwrap().unwrap();
    let mut second = store.find_by_id(created.id).await.unwrap().unwrap();

    first.sms_factor_enabled = true;
    first.phone_number = Some("+15550001111".into());
    store.save(first).await.unwrap();

    second.email_factor_enabled = true;
    let result = store.save(second).await;
    assert!(matches!(result, Err(TwogateError::Conflict { .. })));

    // Only the winner's write is visible.
    let stored = store.find_by_id(created.id).await.unwrap().unwrap();
    assert!(stored.sms_factor_enabled);
    assert!(!stored.email_factor_enabled);
}

#[tokio::test]
async fn save_unknown_identity_is_not_found() {
    let store = MemoryCredentialStore::new();
    let mut identity = store.create(draft("grace@example.com")).await.unwrap();
    identity.id = uuid::Uuid::new_v4();

    let result = store.save(identity).await;
    assert!(matches!(result, Err(TwogateError::NotFound { .. })));
}

#[tokio::test]
async fn pending_code_roundtrips_through_save() {
    let store = MemoryCredentialStore::new();
    let mut identity = store.create(draft("heidi@example.com")).await.unwrap();

    identity.pending_code = Some(PendingCode {
        code: "123456".into(),
        expires_at: chrono::Utc::now() + chrono::Duration::minutes(5),
    });
    let saved = store.save(identity).await.unwrap();

    let fetched = store.find_by_id(saved.id).await.unwrap().unwrap();
    let pending = fetched.pending_code.unwrap();
    assert_eq!(pending.code, "123456");
}

#[tokio::test]
async fn list_returns_identities_in_creation_order() {
    let store = MemoryCredentialStore::new();
    for i in 0..3 {
        store
            .create(draft(&format!("user-{i}@example.com")))
            .await
            .unwrap();
    }

    let all = store.list().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn clones_share_state() {
    let store = MemoryCredentialStore::new();
    let handle = store.clone();

    let created = handle.create(draft("ivan@example.com")).await.unwrap();

    let fetched = store.find_by_id(created.id).await.unwrap();
    assert!(fetched.is_some());
}
