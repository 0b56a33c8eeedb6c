//! Core types for Copperpot.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod identity;
pub mod item;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{GuestSessionId, Identity};
pub use item::ItemRef;
pub use status::{OrderStatus, ReservationStatus};
