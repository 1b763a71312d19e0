//! Application state, error mapping, extractors, and router assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::{error, info};
use twogate_auth::gateway::{LogMailGateway, LogSmsGateway};
use twogate_auth::throttle::AttemptThrottle;
use twogate_auth::token::{self, VerifiedSession};
use twogate_auth::{AuthError, AuthService};
use twogate_core::error::TwogateError;
use twogate_store::MemoryCredentialStore;

use crate::handlers;

/// The service composition this binary serves: in-memory store and
/// log-only delivery gateways. Real deployments substitute gateways at
/// construction time; the router is generic over none of it.
pub type AppAuthService = AuthService<MemoryCredentialStore, LogSmsGateway, LogMailGateway>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppAuthService>,
    pub throttle: Arc<AttemptThrottle>,
}

impl AppState {
    pub fn new(service: AppAuthService) -> Self {
        let throttle = AttemptThrottle::from_config(service.config());
        Self {
            service: Arc::new(service),
            throttle: Arc::new(throttle),
        }
    }
}

/// Transport-level error. Core failures carry their own HTTP mapping;
/// `Forbidden` exists only at this layer, for the admin gate.
#[derive(Debug)]
pub enum ApiError {
    Core(TwogateError),
    Forbidden,
}

impl From<TwogateError> for ApiError {
    fn from(err: TwogateError) -> Self {
        ApiError::Core(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Core(err) => match &err {
                TwogateError::DuplicateEmail
                | TwogateError::MissingPhoneNumber
                | TwogateError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                TwogateError::InvalidCredentials
                | TwogateError::InvalidCode
                | TwogateError::ExpiredCode => (StatusCode::UNAUTHORIZED, err.to_string()),
                TwogateError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
                TwogateError::ThrottleExceeded => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
                TwogateError::Conflict { .. } | TwogateError::Internal(_) => {
                    // The cause goes to the log, not the response body.
                    error!("request failed: {err}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
                }
            },
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Client address used as the throttle key.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(
            client_ip(&parts.headers).unwrap_or_else(|| "unknown".to_string()),
        ))
    }
}

/// Extract a client IP from common proxy headers: the first hop of
/// `x-forwarded-for`, then `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Bearer-token extractor. A handler that takes `AuthSession` only
/// runs for requests carrying a valid session token; everything else
/// is rejected as a credential failure before the handler body.
#[derive(Debug, Clone)]
pub struct AuthSession(pub VerifiedSession);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Core(TwogateError::InvalidCredentials))?;

        let session = token::validate_session_token(token, state.service.config())?;
        Ok(AuthSession(session))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/auth/setup-2fa", get(handlers::setup_2fa))
        .route("/auth/confirm-2fa", post(handlers::confirm_2fa))
        .route("/auth/disable-2fa", post(handlers::disable_2fa))
        .route("/auth/sms-2fa", post(handlers::sms_2fa))
        .route("/auth/email-2fa", post(handlers::email_2fa))
        .route("/auth/change-password", post(handlers::change_password))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/users", get(handlers::list_users))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
