//! The authentication orchestrator.
//!
//! `AuthService` drives the login state machine: password check, second
//! factor resolution by fixed precedence (TOTP over SMS over email),
//! challenge dispatch, and session issuance. It is generic over the
//! credential store and the delivery gateways so tests can substitute
//! in-memory fakes.

use chrono::{Duration, Utc};
use tracing::{error, info};
use twogate_core::error::{TwogateError, TwogateResult};
use twogate_core::models::identity::{
    Identity, NewIdentity, PendingCode, Role, SecondFactor, is_valid_email, normalize_email,
};
use twogate_core::store::CredentialStore;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gateway::{MailGateway, SmsGateway};
use crate::{channel, password, token, totp};

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// A fully authenticated session: the signed token plus the identity
/// it was issued for.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub token: String,
    pub identity: Identity,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// What a password check leads to: a session outright, or a pending
/// second-factor challenge that `verify_second_factor` completes.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(SessionOutput),
    ChallengeRequired {
        user_id: Uuid,
        method: SecondFactor,
    },
}

/// TOTP enrollment material handed to the client for authenticator
/// registration. The factor stays inactive until a code is confirmed.
#[derive(Debug, Clone)]
pub struct TotpSetup {
    /// Base32-encoded shared secret.
    pub secret: String,
    /// otpauth:// provisioning URI.
    pub otpauth_url: String,
}

pub struct AuthService<C: CredentialStore, S: SmsGateway, M: MailGateway> {
    store: C,
    sms: S,
    mail: M,
    config: AuthConfig,
}

impl<C: CredentialStore, S: SmsGateway, M: MailGateway> AuthService<C, S, M> {
    pub fn new(store: C, sms: S, mail: M, config: AuthConfig) -> Self {
        Self {
            store,
            sms,
            mail,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a new identity and issue a session for it.
    ///
    /// A fresh account has no second factor yet, so registration
    /// authenticates directly.
    pub async fn register(&self, input: RegisterInput) -> TwogateResult<SessionOutput> {
        // 1. Normalize and validate the input.
        let email = normalize_email(&input.email);
        if email.is_empty() || input.password.is_empty() {
            return Err(TwogateError::Validation {
                message: "email and password are required".into(),
            });
        }
        if !is_valid_email(&email) {
            return Err(TwogateError::Validation {
                message: "invalid email address".into(),
            });
        }

        // 2. Reject taken addresses before paying for the hash; the
        //    store re-checks on insert, so races still get one winner.
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(TwogateError::DuplicateEmail);
        }

        // 3. Hash the password and persist the identity.
        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let identity = self
            .store
            .create(NewIdentity {
                email,
                password_hash,
                phone_number: input.phone_number.filter(|p| !p.trim().is_empty()),
                role: Role::User,
            })
            .await?;

        info!(user = %identity.id, "identity registered");

        // 4. Issue the session.
        self.issue_session(&identity)
    }

    /// Check credentials and either authenticate or open a
    /// second-factor challenge.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller: both fail with the same credential rejection.
    pub async fn login(&self, input: LoginInput) -> TwogateResult<LoginOutcome> {
        // 1. Look up the identity.
        let Some(identity) = self.store.find_by_email(&input.email).await? else {
            return Err(TwogateError::InvalidCredentials);
        };

        // 2. Verify the password.
        let valid = password::verify_password(
            &input.password,
            &identity.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(TwogateError::InvalidCredentials);
        }

        // 3. Resolve the active second factor and open its challenge.
        match identity.active_second_factor() {
            // TOTP: the authenticator app already holds the secret, so
            // there is nothing to deliver and nothing to persist.
            Some(SecondFactor::Totp) => Ok(LoginOutcome::ChallengeRequired {
                user_id: identity.id,
                method: SecondFactor::Totp,
            }),
            Some(SecondFactor::Sms) => {
                let phone = identity
                    .phone_number
                    .clone()
                    .ok_or(TwogateError::MissingPhoneNumber)?;
                let (saved, code) = self.store_pending_code(identity).await?;
                let body = channel::sms_body(&code, self.code_ttl_minutes());
                if let Err(err) = self.sms.send(&phone, &body).await {
                    error!(user = %saved.id, "SMS code dispatch failed: {err}");
                    return Err(AuthError::Delivery(err).into());
                }
                Ok(LoginOutcome::ChallengeRequired {
                    user_id: saved.id,
                    method: SecondFactor::Sms,
                })
            }
            Some(SecondFactor::Email) => {
                let (saved, code) = self.store_pending_code(identity).await?;
                let body = channel::email_body(&code, self.code_ttl_minutes());
                if let Err(err) = self
                    .mail
                    .send(&saved.email, channel::email_subject(), &body)
                    .await
                {
                    error!(user = %saved.id, "email code dispatch failed: {err}");
                    return Err(AuthError::Delivery(err).into());
                }
                Ok(LoginOutcome::ChallengeRequired {
                    user_id: saved.id,
                    method: SecondFactor::Email,
                })
            }
            // 4. No second factor: authenticated outright.
            None => Ok(LoginOutcome::Authenticated(self.issue_session(&identity)?)),
        }
    }

    /// Complete a second-factor challenge and issue the session.
    ///
    /// The code is checked against whichever factor is currently
    /// active. Channel codes are single use: success consumes the
    /// code, and an expired one is consumed on first encounter too,
    /// so it cannot be retried into validity.
    pub async fn verify_second_factor(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> TwogateResult<SessionOutput> {
        // 1. The identity must exist. Unlike login, an unknown id is a
        //    visible NotFound: the id came from our own challenge.
        let identity = self.fetch(user_id).await?;

        // 2. Route to the active factor's verification path.
        match identity.active_second_factor() {
            Some(SecondFactor::Totp) => {
                let sealed = identity.totp_secret.as_deref().ok_or_else(|| {
                    TwogateError::Internal("TOTP enabled without a stored secret".into())
                })?;
                let secret =
                    totp::open_secret(self.config.secret_encryption_key.as_ref(), sealed)?;
                let ok = totp::verify_code(
                    &secret,
                    code,
                    &self.config.totp_issuer,
                    &identity.email,
                )?;
                if !ok {
                    return Err(TwogateError::InvalidCode);
                }
                self.issue_session(&identity)
            }
            Some(SecondFactor::Sms | SecondFactor::Email) => {
                let Some(pending) = identity.pending_code.clone() else {
                    return Err(TwogateError::InvalidCode);
                };

                // 3. An expired code is cleared even though the attempt
                //    fails; the next login issues a fresh one.
                if pending.is_expired(Utc::now()) {
                    let mut cleared = identity;
                    cleared.pending_code = None;
                    self.store.save(cleared).await?;
                    return Err(TwogateError::ExpiredCode);
                }

                // 4. A mismatch leaves the pending code in place for
                //    another attempt within its lifetime.
                if pending.code != code {
                    return Err(TwogateError::InvalidCode);
                }

                // 5. Consume the code, then issue the session.
                let mut cleared = identity;
                cleared.pending_code = None;
                let saved = self.store.save(cleared).await?;
                self.issue_session(&saved)
            }
            // No active factor means no challenge is open.
            None => Err(TwogateError::InvalidCode),
        }
    }

    /// Begin (or resume) TOTP enrollment for an identity.
    ///
    /// Idempotent until confirmed: re-running setup hands back the
    /// already-stored secret, so a re-opened enrollment screen never
    /// invalidates an authenticator entry the user scanned earlier.
    pub async fn setup_totp(&self, user_id: Uuid) -> TwogateResult<TotpSetup> {
        let mut identity = self.fetch(user_id).await?;

        if let Some(sealed) = identity.totp_secret.as_deref() {
            let secret = totp::open_secret(self.config.secret_encryption_key.as_ref(), sealed)?;
            let otpauth_url =
                totp::provisioning_uri(&secret, &self.config.totp_issuer, &identity.email)?;
            return Ok(TotpSetup {
                secret,
                otpauth_url,
            });
        }

        let (secret, otpauth_url) =
            totp::generate_enrollment(&self.config.totp_issuer, &identity.email)?;
        identity.totp_secret = Some(totp::seal_secret(
            self.config.secret_encryption_key.as_ref(),
            &secret,
        )?);
        self.store.save(identity).await?;

        Ok(TotpSetup {
            secret,
            otpauth_url,
        })
    }

    /// Confirm TOTP enrollment with a code from the authenticator.
    /// Only after this does login start challenging with TOTP.
    pub async fn confirm_totp(&self, user_id: Uuid, code: &str) -> TwogateResult<()> {
        let mut identity = self.fetch(user_id).await?;

        // Without an enrolled secret there is nothing to confirm.
        let Some(sealed) = identity.totp_secret.as_deref() else {
            return Err(TwogateError::InvalidCode);
        };
        let secret = totp::open_secret(self.config.secret_encryption_key.as_ref(), sealed)?;
        if !totp::verify_code(&secret, code, &self.config.totp_issuer, &identity.email)? {
            return Err(TwogateError::InvalidCode);
        }

        identity.totp_enabled = true;
        self.store.save(identity).await?;
        info!(user = %user_id, "TOTP factor confirmed");
        Ok(())
    }

    /// Disable TOTP and discard the stored secret. Idempotent; a
    /// half-finished enrollment is discarded the same way.
    pub async fn disable_totp(&self, user_id: Uuid) -> TwogateResult<()> {
        let mut identity = self.fetch(user_id).await?;

        identity.totp_secret = None;
        identity.totp_enabled = false;
        self.store.save(identity).await?;
        info!(user = %user_id, "TOTP factor disabled");
        Ok(())
    }

    /// Enable or disable the SMS factor.
    ///
    /// Enabling requires a phone number, either supplied here or
    /// already on record. Disabling forgets the number as well.
    pub async fn toggle_sms_factor(
        &self,
        user_id: Uuid,
        enable: bool,
        phone_number: Option<String>,
    ) -> TwogateResult<()> {
        let mut identity = self.fetch(user_id).await?;

        if enable {
            let phone = phone_number
                .filter(|p| !p.trim().is_empty())
                .or_else(|| identity.phone_number.clone())
                .ok_or(TwogateError::MissingPhoneNumber)?;
            identity.phone_number = Some(phone);
            identity.sms_factor_enabled = true;
        } else {
            identity.sms_factor_enabled = false;
            identity.phone_number = None;
        }
        self.store.save(identity).await?;
        Ok(())
    }

    /// Enable or disable the email factor. The login email doubles as
    /// the delivery address, so there is nothing further to collect.
    pub async fn toggle_email_factor(&self, user_id: Uuid, enable: bool) -> TwogateResult<()> {
        let mut identity = self.fetch(user_id).await?;

        identity.email_factor_enabled = enable;
        self.store.save(identity).await?;
        Ok(())
    }

    /// Change the password after re-verifying the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> TwogateResult<()> {
        let mut identity = self.fetch(user_id).await?;

        let valid = password::verify_password(
            old_password,
            &identity.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(TwogateError::InvalidCredentials);
        }
        if new_password.is_empty() {
            return Err(TwogateError::Validation {
                message: "new password must not be empty".into(),
            });
        }

        identity.password_hash =
            password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.store.save(identity).await?;
        info!(user = %user_id, "password changed");
        Ok(())
    }

    /// Acknowledge a logout. Sessions are stateless JWTs with no
    /// server-side record, so there is nothing to revoke; the client
    /// discards its token and the token ages out at `exp`.
    pub fn logout(&self) {}

    /// All identities, for the admin listing. Callers project these
    /// through a view before serializing; this returns full records.
    pub async fn list_identities(&self) -> TwogateResult<Vec<Identity>> {
        self.store.list().await
    }

    async fn fetch(&self, user_id: Uuid) -> TwogateResult<Identity> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| TwogateError::NotFound {
                entity: "identity".into(),
                id: user_id.to_string(),
            })
    }

    fn issue_session(&self, identity: &Identity) -> TwogateResult<SessionOutput> {
        let token = token::issue_session_token(identity, &self.config)?;
        Ok(SessionOutput {
            token,
            identity: identity.clone(),
            expires_in: self.config.session_lifetime_secs,
        })
    }

    /// Persist a fresh channel code with its expiry. The code is
    /// stored before dispatch, so a delivery failure leaves a valid
    /// challenge behind while the failure is surfaced to the caller.
    async fn store_pending_code(&self, mut identity: Identity) -> TwogateResult<(Identity, String)> {
        let code = channel::generate_code();
        let expires_at =
            Utc::now() + Duration::seconds(self.config.channel_code_lifetime_secs as i64);
        identity.pending_code = Some(PendingCode {
            code: code.clone(),
            expires_at,
        });
        let saved = self.store.save(identity).await?;
        Ok((saved, code))
    }

    fn code_ttl_minutes(&self) -> u64 {
        self.config.channel_code_lifetime_secs / 60
    }
}
