//! Error taxonomy for the checkout core.
//!
//! All failures are local and synchronous: they are returned to the caller
//! before any partial write becomes visible. The only retryable condition is
//! [`CoreError::Serialization`], which the services retry a bounded number of
//! times on the caller's behalf.

use thiserror::Error;

/// Errors produced by the checkout and reservation services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or malformed. Rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced row does not exist, or exists but is not visible to the
    /// caller. The two cases are deliberately indistinguishable.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The item exists but cannot be purchased right now.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The request collides with existing state, e.g. a reservation inside
    /// another booking's 30-minute window.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor may see the row but lacks rights to the requested mutation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A stored row violates an invariant the types are supposed to uphold
    /// (e.g. an order with both a user id and a guest session id).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The transaction lost a serialization race. Safe to retry: nothing
    /// survives the rolled-back attempt.
    #[error("transaction serialization conflict")]
    Serialization,

    /// The database failed in a way we do not interpret.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// `PostgreSQL` reports a lost serialization race as SQLSTATE 40001; every
/// other database failure stays opaque.
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.code().as_deref() == Some("40001")
        {
            return Self::Serialization;
        }
        Self::Database(err)
    }
}

impl CoreError {
    /// Whether the operation that produced this error may be retried as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Serialization)
    }

    /// Shorthand for a [`CoreError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type alias for the checkout core.
pub type Result<T> = std::result::Result<T, CoreError>;
