//! Copperpot Core - Shared domain types.
//!
//! This crate provides the common types used across Copperpot components:
//! - `checkout` - Order and reservation transaction core
//! - `integration-tests` - Cross-crate scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. Invariants that the rest of the system depends on (item
//! references pointing at exactly one catalog table, callers being exactly one
//! of authenticated or guest, status lifecycles) are encoded here as sum types
//! and state machines so they cannot be violated by construction.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, identity, item references, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
