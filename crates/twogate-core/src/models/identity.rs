//! Identity domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The second factor an identity is challenged with, resolved from the
/// enablement flags by fixed precedence: TOTP over SMS over email.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecondFactor {
    Totp,
    Sms,
    Email,
}

impl SecondFactor {
    /// Resolves the active factor for an identity, or `None` when no
    /// second factor applies. SMS is only active while a phone number
    /// is on record.
    pub fn for_identity(identity: &Identity) -> Option<SecondFactor> {
        if identity.totp_enabled {
            Some(SecondFactor::Totp)
        } else if identity.sms_factor_enabled && identity.phone_number.is_some() {
            Some(SecondFactor::Sms)
        } else if identity.email_factor_enabled {
            Some(SecondFactor::Email)
        } else {
            None
        }
    }
}

/// An issued-but-unverified channel code. The code and its expiry live
/// and die together; clearing one without the other is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    /// Stored lowercased; lookups are case-insensitive.
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub role: Role,
    /// Base32 TOTP secret, or an AES-256-GCM blob when at-rest
    /// encryption is configured. Present does not imply confirmed.
    pub totp_secret: Option<String>,
    pub totp_enabled: bool,
    pub sms_factor_enabled: bool,
    pub email_factor_enabled: bool,
    pub pending_code: Option<PendingCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store-managed optimistic-concurrency counter; bumped on every save.
    pub revision: u64,
}

impl Identity {
    pub fn active_second_factor(&self) -> Option<SecondFactor> {
        SecondFactor::for_identity(self)
    }
}

/// Draft for a new identity. The password is hashed before the draft is
/// built; plaintext never reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Trims surrounding whitespace and lowercases, so lookups and
/// uniqueness checks agree on a canonical form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural check only: one local part, one domain with a dot, no
/// whitespace. Deliverability is the mail gateway's problem.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            password_hash: "$argon2id$stub".into(),
            phone_number: None,
            role: Role::User,
            totp_secret: None,
            totp_enabled: false,
            sms_factor_enabled: false,
            email_factor_enabled: false,
            pending_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            revision: 0,
        }
    }

    #[test]
    fn no_factor_when_nothing_enabled() {
        assert_eq!(identity().active_second_factor(), None);
    }

    #[test]
    fn totp_wins_over_sms_and_email() {
        let mut id = identity();
        id.totp_enabled = true;
        id.sms_factor_enabled = true;
        id.phone_number = Some("+15550001111".into());
        id.email_factor_enabled = true;
        assert_eq!(id.active_second_factor(), Some(SecondFactor::Totp));
    }

    #[test]
    fn sms_wins_over_email() {
        let mut id = identity();
        id.sms_factor_enabled = true;
        id.phone_number = Some("+15550001111".into());
        id.email_factor_enabled = true;
        assert_eq!(id.active_second_factor(), Some(SecondFactor::Sms));
    }

    #[test]
    fn sms_without_phone_number_is_not_active() {
        let mut id = identity();
        id.sms_factor_enabled = true;
        id.email_factor_enabled = true;
        assert_eq!(id.active_second_factor(), Some(SecondFactor::Email));
    }

    #[test]
    fn second_factor_serializes_uppercase() {
        let json = serde_json::to_string(&SecondFactor::Totp).unwrap();
        assert_eq!(json, "\"TOTP\"");
        let json = serde_json::to_string(&SecondFactor::Sms).unwrap();
        assert_eq!(json, "\"SMS\"");
    }

    #[test]
    fn pending_code_expiry_is_inclusive() {
        let now = Utc::now();
        let pending = PendingCode {
            code: "123456".into(),
            expires_at: now,
        };
        assert!(pending.is_expired(now));
        assert!(pending.is_expired(now + Duration::seconds(1)));
        assert!(!pending.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@ex@ample.com"));
    }
}
