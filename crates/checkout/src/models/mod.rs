//! Domain models for the checkout core.

pub mod order;
pub mod reservation;

pub use order::{ContactInfo, NewOrder, Order, OrderLine};
pub use reservation::{NewReservation, Reservation};
