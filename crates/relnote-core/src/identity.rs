//! Identity resolution for drafts.
//!
//! Whether a draft creates a new row or updates an existing one is carried
//! explicitly on the draft as an [`EntityId`]. The string convention used by
//! clients (a reserved `new-` prefix on locally minted ids) is only
//! interpreted here, at the wire boundary, by [`EntityId::parse`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Reserved prefix on client-minted placeholder identifiers.
pub const PLACEHOLDER_PREFIX: &str = "new-";

/// Identity of a draft entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityId {
    /// Minted locally, never stored.
    Pending { draft_id: String },
    /// Assigned by the store.
    Persisted(Uuid),
}

impl EntityId {
    /// Mint a fresh placeholder id.
    pub fn new_pending() -> Self {
        EntityId::Pending {
            draft_id: format!("{}{}", PLACEHOLDER_PREFIX, Uuid::now_v7().simple()),
        }
    }

    /// Parse a wire identifier.
    ///
    /// Anything carrying [`PLACEHOLDER_PREFIX`] is `Pending`, whatever follows
    /// the prefix. An empty id counts as unassigned and gets a fresh
    /// placeholder. Everything else must be a store UUID.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(EntityId::new_pending());
        }
        if raw.starts_with(PLACEHOLDER_PREFIX) {
            return Ok(EntityId::Pending {
                draft_id: raw.to_string(),
            });
        }
        Uuid::parse_str(raw)
            .map(EntityId::Persisted)
            .map_err(|_| Error::InvalidInput(format!("'{}' is not a valid identifier", raw)))
    }

    /// Store id, if this entity has been persisted.
    pub fn store_id(&self) -> Option<Uuid> {
        match self {
            EntityId::Persisted(id) => Some(*id),
            EntityId::Pending { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntityId::Pending { .. })
    }
}

impl TryFrom<String> for EntityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        EntityId::parse(&value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Pending { draft_id } => f.write_str(draft_id),
            EntityId::Persisted(id) => write!(f, "{}", id),
        }
    }
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Row must be created.
    New,
    /// Row exists and is updated in place.
    Existing(Uuid),
}

/// Decide between create and update for an optional id.
pub fn resolve(id: Option<&EntityId>) -> Resolution {
    match id.and_then(EntityId::store_id) {
        Some(id) => Resolution::Existing(id),
        None => Resolution::New,
    }
}

/// Resolve a raw wire identifier.
///
/// An absent or empty id and any id carrying the placeholder prefix resolve
/// to `New`, even if a stored row happens to have that literal id.
pub fn resolve_str(id: Option<&str>) -> Result<Resolution> {
    match id {
        None => Ok(Resolution::New),
        Some(raw) => Ok(resolve(Some(&EntityId::parse(raw)?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_id_is_new() {
        assert_eq!(resolve(None), Resolution::New);
        assert_eq!(resolve_str(None).unwrap(), Resolution::New);
    }

    #[test]
    fn test_empty_id_is_new() {
        assert_eq!(resolve_str(Some("")).unwrap(), Resolution::New);
        assert_eq!(resolve_str(Some("  ")).unwrap(), Resolution::New);

        let id = EntityId::parse("").unwrap();
        assert!(id.is_pending());
        assert!(id.to_string().starts_with(PLACEHOLDER_PREFIX));
    }

    #[test]
    fn test_pending_is_new() {
        assert_eq!(resolve(Some(&EntityId::new_pending())), Resolution::New);
    }

    #[test]
    fn test_persisted_is_existing() {
        let id = Uuid::new_v4();
        assert_eq!(
            resolve(Some(&EntityId::Persisted(id))),
            Resolution::Existing(id)
        );
    }

    #[test]
    fn test_prefixed_uuid_is_still_new() {
        // The suffix parses as a UUID, the prefix wins anyway.
        let raw = format!("new-{}", Uuid::new_v4());
        assert_eq!(resolve_str(Some(&raw)).unwrap(), Resolution::New);
    }

    #[test]
    fn test_plain_uuid_string_is_existing() {
        let id = Uuid::new_v4();
        assert_eq!(
            resolve_str(Some(&id.to_string())).unwrap(),
            Resolution::Existing(id)
        );
    }

    #[test]
    fn test_garbage_id_is_rejected() {
        let err = resolve_str(Some("release-42")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_new_pending_carries_prefix_and_is_unique() {
        let a = EntityId::new_pending();
        let b = EntityId::new_pending();
        assert!(a.to_string().starts_with(PLACEHOLDER_PREFIX));
        assert_ne!(a, b);
        assert!(a.is_pending());
        assert_eq!(a.store_id(), None);
    }

    #[test]
    fn test_serde_roundtrip_through_wire_string() {
        let id = EntityId::Persisted(Uuid::new_v4());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let pending: EntityId = serde_json::from_str("\"new-abc\"").unwrap();
        assert_eq!(
            pending,
            EntityId::Pending {
                draft_id: "new-abc".to_string()
            }
        );
    }
}
