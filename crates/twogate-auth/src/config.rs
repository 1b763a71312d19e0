//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// Session token lifetime in seconds (default: 86_400 = 24 hours).
    pub session_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// 256-bit AES-GCM key for encrypting TOTP secrets at rest.
    /// `None` stores the base32 secret directly.
    pub secret_encryption_key: Option<[u8; 32]>,
    /// Channel code lifetime in seconds (default: 300 = 5 minutes).
    pub channel_code_lifetime_secs: u64,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// Attempt throttle: max attempts per source within the window
    /// (default: 10).
    pub throttle_max_attempts: u32,
    /// Attempt throttle window in seconds (default: 900 = 15 minutes).
    pub throttle_window_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            session_lifetime_secs: 86_400,
            jwt_issuer: "twogate".into(),
            pepper: None,
            secret_encryption_key: None,
            channel_code_lifetime_secs: 300,
            totp_issuer: "TwoGate".into(),
            throttle_max_attempts: 10,
            throttle_window_secs: 900,
        }
    }
}
