//! twogate-auth — password verification, second-factor lifecycle
//! (TOTP and channel codes), session token issuance, and the login
//! orchestrator.

pub mod channel;
pub mod config;
pub mod error;
pub mod gateway;
pub mod password;
pub mod service;
pub mod throttle;
pub mod token;
pub mod totp;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutcome, RegisterInput, SessionOutput, TotpSetup};
pub use token::SessionClaims;
