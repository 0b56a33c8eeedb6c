//! References into the two parallel catalog tables.
//!
//! The catalog is mid-migration: some items live in the current table, some
//! in the legacy one. A line item points at exactly one of the two, so the
//! reference is a tagged union rather than two nullable foreign keys. A
//! reference resolves only against its own table - a legacy id must never be
//! silently matched against the current table, or vice versa.

use serde::{Deserialize, Serialize};

use super::id::{ItemId, LegacyItemId};

/// A reference to a catalog item in one of the two catalog tables.
///
/// Serializes as `{"kind": "current", "id": 7}` / `{"kind": "legacy", "id": 7}`,
/// matching the wire shape clients submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    /// An item in the current catalog table.
    Current(ItemId),
    /// An item in the legacy catalog table.
    Legacy(LegacyItemId),
}

impl ItemRef {
    /// The current-catalog id, if any.
    #[must_use]
    pub const fn current_id(&self) -> Option<ItemId> {
        match self {
            Self::Current(id) => Some(*id),
            Self::Legacy(_) => None,
        }
    }

    /// The legacy-catalog id, if any.
    #[must_use]
    pub const fn legacy_id(&self) -> Option<LegacyItemId> {
        match self {
            Self::Legacy(id) => Some(*id),
            Self::Current(_) => None,
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current(id) => write!(f, "current:{id}"),
            Self::Legacy(id) => write!(f, "legacy:{id}"),
        }
    }
}
