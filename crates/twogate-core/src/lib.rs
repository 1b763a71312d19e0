//! Core domain types for twogate: the identity model, the credential
//! store abstraction, and the failure taxonomy shared by every crate.

pub mod error;
pub mod models;
pub mod store;
