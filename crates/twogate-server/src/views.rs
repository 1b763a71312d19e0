//! Public projections of stored identities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use twogate_core::models::identity::{Identity, Role};
use uuid::Uuid;

/// What the API shows of an identity. Password hashes, TOTP secrets,
/// and pending-code state have no field here, so they cannot leak
/// through serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub two_factor_enabled: bool,
    #[serde(rename = "sms2FAEnabled")]
    pub sms_factor_enabled: bool,
    #[serde(rename = "email2FAEnabled")]
    pub email_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            phone_number: identity.phone_number.clone(),
            role: identity.role,
            two_factor_enabled: identity.totp_enabled,
            sms_factor_enabled: identity.sms_factor_enabled,
            email_factor_enabled: identity.email_factor_enabled,
            created_at: identity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twogate_core::models::identity::PendingCode;

    #[test]
    fn view_serializes_wire_names_and_hides_secrets() {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$stub".into(),
            phone_number: Some("+15550001111".into()),
            role: Role::User,
            totp_secret: Some("JBSWY3DPEHPK3PXP".into()),
            totp_enabled: true,
            sms_factor_enabled: true,
            email_factor_enabled: false,
            pending_code: Some(PendingCode {
                code: "123456".into(),
                expires_at: Utc::now(),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            revision: 3,
        };

        let value = serde_json::to_value(IdentityView::from(&identity)).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["email"], "alice@example.com");
        assert_eq!(object["phoneNumber"], "+15550001111");
        assert_eq!(object["twoFactorEnabled"], true);
        assert_eq!(object["sms2FAEnabled"], true);
        assert_eq!(object["email2FAEnabled"], false);
        assert!(object.contains_key("createdAt"));

        assert!(!object.contains_key("passwordHash"));
        assert!(!object.contains_key("totpSecret"));
        assert!(!object.contains_key("pendingCode"));
        assert!(!object.contains_key("revision"));
    }
}
