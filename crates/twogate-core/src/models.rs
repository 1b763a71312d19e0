//! Domain models for twogate.
//!
//! These are the core types shared across all crates.

pub mod identity;
