//! twogate-server — the HTTP boundary for the authentication core.
//!
//! A thin axum layer: routes, wire DTOs, bearer-token extraction, and
//! status-code mapping. Every business decision lives behind it in
//! [`twogate_auth::AuthService`].

pub mod api;
pub mod handlers;
pub mod views;

pub use api::{AppState, create_router};
