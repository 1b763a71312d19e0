//! TOTP enrollment, verification, and at-rest secret protection.
//!
//! Secrets travel as base32 strings (the form authenticator apps
//! accept). When an at-rest key is configured the stored form is
//! AES-256-GCM `base64(nonce || ciphertext || tag)`; otherwise the
//! base32 string is stored directly.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

/// RFC 6238 defaults: SHA-1, 6 digits, 30-second step, one step of
/// clock skew tolerated either side.
fn build_totp(secret_bytes: Vec<u8>, issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))
}

fn decode_base32(secret: &str) -> Result<Vec<u8>, AuthError> {
    Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret decode: {e}")))
}

/// Generate a fresh TOTP enrollment.
///
/// Returns `(base32_secret, otpauth_uri)` where the URI labels the
/// account as `<issuer>:<account>`.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<(String, String), AuthError> {
    let secret = Secret::generate_secret();
    let secret_bytes = secret
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e}")))?;

    let totp = build_totp(secret_bytes, issuer, account)?;
    let base32 = secret.to_encoded().to_string();
    let uri = totp.get_url();

    Ok((base32, uri))
}

/// Rebuild the otpauth URI for an existing secret. Deterministic, so
/// resuming an unconfirmed enrollment presents the same QR payload.
pub fn provisioning_uri(
    secret_base32: &str,
    issuer: &str,
    account: &str,
) -> Result<String, AuthError> {
    let totp = build_totp(decode_base32(secret_base32)?, issuer, account)?;
    Ok(totp.get_url())
}

/// Render the provisioning URI as a PNG data URL for QR display.
pub fn qr_data_url(secret_base32: &str, issuer: &str, account: &str) -> Result<String, AuthError> {
    let totp = build_totp(decode_base32(secret_base32)?, issuer, account)?;
    let png = totp
        .get_qr_base64()
        .map_err(|e| AuthError::Crypto(format!("QR render: {e}")))?;
    Ok(format!("data:image/png;base64,{png}"))
}

/// Check a code against a base32 secret for the current time step.
/// Stateless: a code stays valid for its whole step.
pub fn verify_code(
    secret_base32: &str,
    code: &str,
    issuer: &str,
    account: &str,
) -> Result<bool, AuthError> {
    let totp = build_totp(decode_base32(secret_base32)?, issuer, account)?;
    totp.check_current(code)
        .map_err(|e| AuthError::Crypto(format!("TOTP check: {e}")))
}

/// Prepare a base32 secret for storage: AES-256-GCM encrypted when an
/// at-rest key is configured, as-is otherwise.
pub fn seal_secret(key: Option<&[u8; 32]>, base32: &str) -> Result<String, AuthError> {
    match key {
        Some(key) => encrypt_secret(key, base32.as_bytes()),
        None => Ok(base32.to_string()),
    }
}

/// Recover the base32 secret from its stored form.
pub fn open_secret(key: Option<&[u8; 32]>, stored: &str) -> Result<String, AuthError> {
    match key {
        Some(key) => {
            let bytes = decrypt_secret(key, stored)?;
            String::from_utf8(bytes).map_err(|_| AuthError::Crypto("secret is not UTF-8".into()))
        }
        None => Ok(stored.to_string()),
    }
}

/// Encrypt a TOTP secret with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM protected TOTP secret.
fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < 13 {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_produces_valid_uri() {
        let (base32, uri) = generate_enrollment("TwoGate", "alice@example.com").unwrap();
        assert!(!base32.is_empty());
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("TwoGate"));
        assert!(uri.contains("alice"));
    }

    #[test]
    fn provisioning_uri_is_stable() {
        let (base32, uri) = generate_enrollment("TwoGate", "bob@example.com").unwrap();
        let rebuilt = provisioning_uri(&base32, "TwoGate", "bob@example.com").unwrap();
        assert_eq!(uri, rebuilt);
    }

    #[test]
    fn verify_accepts_current_code() {
        let (base32, _) = generate_enrollment("TwoGate", "carol@example.com").unwrap();

        let totp = build_totp(decode_base32(&base32).unwrap(), "TwoGate", "carol@example.com")
            .unwrap();
        let code = totp.generate_current().unwrap();

        assert!(verify_code(&base32, &code, "TwoGate", "carol@example.com").unwrap());
    }

    #[test]
    fn verify_rejects_wrong_code() {
        let (base32, _) = generate_enrollment("TwoGate", "dave@example.com").unwrap();
        assert!(!verify_code(&base32, "000000", "TwoGate", "dave@example.com").unwrap());
    }

    #[test]
    fn seal_open_roundtrip_with_key() {
        let key = [42u8; 32];
        let (base32, _) = generate_enrollment("TwoGate", "eve@example.com").unwrap();

        let sealed = seal_secret(Some(&key), &base32).unwrap();
        assert_ne!(sealed, base32);

        let opened = open_secret(Some(&key), &sealed).unwrap();
        assert_eq!(opened, base32);
    }

    #[test]
    fn seal_without_key_is_passthrough() {
        let sealed = seal_secret(None, "JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(sealed, "JBSWY3DPEHPK3PXP");
        assert_eq!(open_secret(None, &sealed).unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn wrong_key_fails_open() {
        let key1 = [42u8; 32];
        let key2 = [99u8; 32];
        let sealed = seal_secret(Some(&key1), "JBSWY3DPEHPK3PXP").unwrap();
        assert!(open_secret(Some(&key2), &sealed).is_err());
    }

    #[test]
    fn qr_is_a_png_data_url() {
        let (base32, _) = generate_enrollment("TwoGate", "frank@example.com").unwrap();
        let qr = qr_data_url(&base32, "TwoGate", "frank@example.com").unwrap();
        assert!(qr.starts_with("data:image/png;base64,"));
        assert!(qr.len() > "data:image/png;base64,".len());
    }
}
