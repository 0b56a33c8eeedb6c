//! Copperpot checkout - the order and reservation transaction core.
//!
//! This crate turns client-submitted carts and booking requests into durable,
//! price-correct, access-controlled records. Everything else in the system
//! (catalog management, theming, payment webhooks, notifications, HTTP) is an
//! external collaborator consumed through the trait seams in [`store`],
//! [`discounts`], and [`hooks`].
//!
//! # Flow
//!
//! A request arrives with an explicit [`copperpot_core::Identity`] or an
//! [`access::Actor`]. The access layer derives what the caller may touch, the
//! catalog resolver looks each line up in whichever of the two catalog tables
//! holds it, the pricing calculator recomputes authoritative amounts (client
//! prices are never trusted), and the writer persists header plus lines in one
//! transaction. Reservations go through temporal validation and a
//! duplicate-window check inside their own insert transaction.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod checkout;
pub mod config;
pub mod db;
pub mod discounts;
pub mod error;
pub mod hooks;
pub mod models;
pub mod pricing;
pub mod reservations;
pub mod store;
