//! Tag upsert.
//!
//! A tag draft with a persisted id updates that row in place; any other
//! draft inserts a new row. There is no lookup by name first: two releases
//! that both submit a new "Performance" tag get two rows. Without an atomic
//! check-and-insert on the store a lookup would only narrow that race, not
//! close it, so duplicates are accepted and readers must not assume tag
//! names are unique.

use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::identity::{resolve, EntityId, Resolution};
use crate::models::{Tag, TagDraft};
use crate::traits::ReleaseStore;

/// Persists tag drafts one row at a time.
#[derive(Clone)]
pub struct TagUpsertService {
    store: Arc<dyn ReleaseStore>,
}

impl TagUpsertService {
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self { store }
    }

    /// Persist one tag and return it with its stable id.
    ///
    /// Writes exactly one row. On success the draft's id is promoted to
    /// `Persisted`, so upserting the same draft again updates rather than
    /// inserting a second row.
    pub async fn upsert(&self, draft: &mut TagDraft) -> Result<Tag> {
        let id = match resolve(draft.id.as_ref()) {
            Resolution::Existing(id) => {
                self.store.update_tag(id, &draft.name, &draft.color).await?;
                trace!(
                    subsystem = "engine",
                    component = "tag_upsert",
                    op = "update",
                    tag_id = %id,
                    "Tag updated"
                );
                id
            }
            Resolution::New => {
                let id = self.store.insert_tag(&draft.name, &draft.color).await?;
                trace!(
                    subsystem = "engine",
                    component = "tag_upsert",
                    op = "insert",
                    tag_id = %id,
                    "Tag inserted"
                );
                draft.id = Some(EntityId::Persisted(id));
                id
            }
        };

        Ok(Tag {
            id,
            name: draft.name.clone(),
            color: draft.color.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReleaseStore, StoreOp};
    use uuid::Uuid;

    fn service() -> (MemoryReleaseStore, TagUpsertService) {
        let store = MemoryReleaseStore::new();
        let service = TagUpsertService::new(Arc::new(store.clone()));
        (store, service)
    }

    #[tokio::test]
    async fn test_new_tag_is_inserted_and_promoted() {
        let (store, service) = service();
        let mut draft = TagDraft::new("perf", "#fff");

        let tag = service.upsert(&mut draft).await.unwrap();

        assert_eq!(draft.id, Some(EntityId::Persisted(tag.id)));
        assert_eq!(store.list_tags().await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn test_replayed_draft_updates_instead_of_inserting() {
        let (store, service) = service();
        let mut draft = TagDraft::new("perf", "#fff");

        let first = service.upsert(&mut draft).await.unwrap();
        draft.color = "#000".to_string();
        let second = service.upsert(&mut draft).await.unwrap();

        assert_eq!(first.id, second.id);
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].color, "#000");
        assert_eq!(store.call_count(StoreOp::InsertTag).await, 1);
        assert_eq!(store.call_count(StoreOp::UpdateTag).await, 1);
    }

    #[tokio::test]
    async fn test_same_name_twice_creates_two_rows() {
        let (store, service) = service();

        let a = service.upsert(&mut TagDraft::new("perf", "#fff")).await.unwrap();
        let b = service.upsert(&mut TagDraft::new("perf", "#fff")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pending_placeholder_inserts() {
        let (store, service) = service();
        let mut draft = TagDraft {
            id: Some(EntityId::new_pending()),
            name: "ui".into(),
            color: "#0af".into(),
        };
        service.upsert(&mut draft).await.unwrap();
        assert_eq!(store.call_count(StoreOp::InsertTag).await, 1);
        assert!(!draft.id.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_fails_and_keeps_id() {
        let (_store, service) = service();
        let id = Uuid::new_v4();
        let mut draft = TagDraft {
            id: Some(EntityId::Persisted(id)),
            name: "ghost".into(),
            color: "#000".into(),
        };

        let err = service.upsert(&mut draft).await.unwrap_err();

        assert!(err.is_storage());
        assert_eq!(draft.id, Some(EntityId::Persisted(id)));
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_draft_pending() {
        let (store, service) = service();
        store.fail_nth(StoreOp::InsertTag, 1).await;
        let mut draft = TagDraft::new("perf", "#fff");

        assert!(service.upsert(&mut draft).await.is_err());
        assert!(draft.id.is_none());
        assert!(store.list_tags().await.unwrap().is_empty());
    }
}
