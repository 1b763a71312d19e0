//! Route handlers and their wire DTOs.
//!
//! Field names follow the established client wire format
//! (`requires2FA`, `userId`, `qrCodeImage`, ...), so the serde renames
//! here are deliberate and load-bearing.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use twogate_auth::service::{LoginInput, LoginOutcome, RegisterInput, SessionOutput};
use twogate_auth::totp;
use twogate_core::error::TwogateError;
use twogate_core::models::identity::SecondFactor;
use uuid::Uuid;

use crate::api::{ApiError, AppState, AuthSession, ClientIp};
use crate::views::IdentityView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmTotpRequest {
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsFactorRequest {
    pub enable: bool,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailFactorRequest {
    pub enable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: IdentityView,
}

impl From<SessionOutput> for SessionResponse {
    fn from(output: SessionOutput) -> Self {
        Self {
            token: output.token,
            user: IdentityView::from(&output.identity),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
    pub user_id: Uuid,
    pub method: SecondFactor,
}

/// Login either completes or opens a challenge; the client switches on
/// the `requires2FA` marker.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Challenge(ChallengeResponse),
    Session(SessionResponse),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
    /// PNG data URL of the provisioning QR code.
    pub qr_code_image: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<IdentityView>,
}

fn missing_payload() -> ApiError {
    ApiError::Core(TwogateError::Validation {
        message: "Missing payload".into(),
    })
}

fn throttled(state: &AppState, ip: &ClientIp) -> Result<(), ApiError> {
    if state.throttle.check(&ip.0) {
        Ok(())
    } else {
        Err(ApiError::Core(TwogateError::ThrottleExceeded))
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    ip: ClientIp,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    throttled(&state, &ip)?;
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let output = state
        .service
        .register(RegisterInput {
            email: request.email,
            password: request.password,
            phone_number: request.phone_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(output.into())))
}

pub async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    throttled(&state, &ip)?;
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let outcome = state
        .service
        .login(LoginInput {
            email: request.email,
            password: request.password,
        })
        .await?;

    let response = match outcome {
        LoginOutcome::Authenticated(output) => LoginResponse::Session(output.into()),
        LoginOutcome::ChallengeRequired { user_id, method } => {
            LoginResponse::Challenge(ChallengeResponse {
                requires_2fa: true,
                user_id,
                method,
            })
        }
    };
    Ok(Json(response))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ip: ClientIp,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    throttled(&state, &ip)?;
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let output = state
        .service
        .verify_second_factor(request.user_id, &request.otp)
        .await?;
    Ok(Json(output.into()))
}

pub async fn setup_2fa(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<TotpSetupResponse>, ApiError> {
    let user_id = session.0.user_id()?;
    let setup = state.service.setup_totp(user_id).await?;

    let config = state.service.config();
    let qr_code_image = totp::qr_data_url(&setup.secret, &config.totp_issuer, &session.0.email)?;

    Ok(Json(TotpSetupResponse {
        secret: setup.secret,
        otpauth_url: setup.otpauth_url,
        qr_code_image,
    }))
}

pub async fn confirm_2fa(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<ConfirmTotpRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let user_id = session.0.user_id()?;
    state.service.confirm_totp(user_id, &request.otp).await?;
    Ok(Json(StatusResponse {
        status: "2FA enabled".into(),
    }))
}

pub async fn disable_2fa(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<StatusResponse>, ApiError> {
    let user_id = session.0.user_id()?;
    state.service.disable_totp(user_id).await?;
    Ok(Json(StatusResponse {
        status: "2FA disabled".into(),
    }))
}

pub async fn sms_2fa(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<SmsFactorRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let user_id = session.0.user_id()?;
    state
        .service
        .toggle_sms_factor(user_id, request.enable, request.phone_number)
        .await?;

    let status = if request.enable {
        "SMS 2FA enabled"
    } else {
        "SMS 2FA disabled"
    };
    Ok(Json(StatusResponse {
        status: status.into(),
    }))
}

pub async fn email_2fa(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<EmailFactorRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let user_id = session.0.user_id()?;
    state
        .service
        .toggle_email_factor(user_id, request.enable)
        .await?;

    let status = if request.enable {
        "Email 2FA enabled"
    } else {
        "Email 2FA disabled"
    };
    Ok(Json(StatusResponse {
        status: status.into(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let user_id = session.0.user_id()?;
    state
        .service
        .change_password(user_id, &request.old_password, &request.new_password)
        .await?;
    Ok(Json(StatusResponse {
        status: "Password changed".into(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthSession(_session): AuthSession,
) -> Json<StatusResponse> {
    state.service.logout();
    Json(StatusResponse {
        status: "Logged out".into(),
    })
}

pub async fn list_users(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<UsersResponse>, ApiError> {
    if !session.0.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let identities = state.service.list_identities().await?;
    let users = identities.iter().map(IdentityView::from).collect();
    Ok(Json(UsersResponse { users }))
}
