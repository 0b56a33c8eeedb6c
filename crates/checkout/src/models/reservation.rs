//! Reservation models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use copperpot_core::{Email, ReservationId, ReservationStatus, UserId};

/// A reservation request that passed validation and is ready to insert.
#[derive(Debug, Clone)]
pub struct NewReservation {
    /// Set when an authenticated customer books; `None` for walk-up requests.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
    pub notes: Option<String>,
}

/// A persisted reservation.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}
