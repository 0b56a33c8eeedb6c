//! Order and reservation lifecycles.
//!
//! Both statuses are real state machines: every mutation goes through
//! `can_transition`, so a terminal row can never be revived no matter which
//! actor asks.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// `pending → processing → shipped → delivered`, with `cancelled` and
/// `failed` reachable from any non-terminal state. Customers never transition
/// orders; the payment webhook and admins do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// Whether no further transitions are allowed from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// Whether `self → to` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing | Self::Cancelled | Self::Failed)
                | (Self::Processing, Self::Shipped | Self::Cancelled | Self::Failed)
                | (Self::Shipped, Self::Delivered | Self::Cancelled | Self::Failed)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Reservation lifecycle status.
///
/// `pending → {confirmed, declined, cancelled}`;
/// `confirmed → {completed, no_show, cancelled}`. The remaining four states
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "reservation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Declined,
    Completed,
    NoShow,
    Cancelled,
}

impl ReservationStatus {
    /// Whether no further transitions are allowed from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Declined | Self::Completed | Self::NoShow | Self::Cancelled
        )
    }

    /// Whether this reservation still occupies its time slot.
    ///
    /// Only active reservations count toward the duplicate-booking window.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether `self → to` is a legal lifecycle step.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (
                Self::Pending,
                Self::Confirmed | Self::Declined | Self::Cancelled
            ) | (
                Self::Confirmed,
                Self::Completed | Self::NoShow | Self::Cancelled
            )
        )
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "declined" => Ok(Self::Declined),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid reservation status: {s}")),
        }
    }
}
