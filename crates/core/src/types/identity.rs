//! Caller identity for checkout and reservations.
//!
//! The system runs two identity models in parallel: authenticated customers
//! (a `user_id` from the auth layer) and anonymous guests (an opaque session
//! id handed out by the session layer). An order belongs to exactly one of
//! the two - never both, never neither - so the identity is a sum type rather
//! than a pair of nullable fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::UserId;

/// Opaque identifier for an anonymous guest session.
///
/// Issued by the session layer; this core never mints or persists one on its
/// own. Guests use it for post-purchase order lookup without an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestSessionId(Uuid);

impl GuestSessionId {
    /// Wrap an existing session id.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for GuestSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for GuestSessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for GuestSessionId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Uuid as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Uuid as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for GuestSessionId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <Uuid as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(id))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for GuestSessionId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Uuid as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Who is placing an order: an authenticated customer or an anonymous guest.
///
/// A request lacking both a user id and a guest session id cannot be
/// represented, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    /// A customer authenticated by the (external) auth layer.
    Authenticated {
        /// The customer's user id.
        user_id: UserId,
    },
    /// An anonymous guest identified by a session-layer token.
    Guest {
        /// The opaque guest session id.
        session_id: GuestSessionId,
    },
}

impl Identity {
    /// The user id, if this is an authenticated identity.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Authenticated { user_id } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    /// The guest session id, if this is a guest identity.
    #[must_use]
    pub const fn guest_session_id(&self) -> Option<GuestSessionId> {
        match self {
            Self::Guest { session_id } => Some(*session_id),
            Self::Authenticated { .. } => None,
        }
    }

    /// Whether this identity is a guest.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}
