//! Credential store implementations.
//!
//! The in-memory store backs the development server and the test
//! suites; persistent backends plug in behind
//! [`twogate_core::store::CredentialStore`].

pub mod memory;

pub use memory::MemoryCredentialStore;
