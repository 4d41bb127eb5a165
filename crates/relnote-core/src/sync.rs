//! Relation synchronization.
//!
//! Makes the `release_tags` and `media` rows of one release match a desired
//! set using independent store calls. Calls are issued strictly one after
//! another; when one fails the method returns immediately and whatever was
//! already written stays written. Repeating the whole call converges,
//! because each sync starts by clearing (or diffing against) the current
//! rows.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{MediaDraft, MediaRow, TagDraft};
use crate::tags::TagUpsertService;
use crate::traits::ReleaseStore;

/// How join rows are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Delete every link, then insert the desired ones.
    #[default]
    Replace,
    /// Read current links, delete the unwanted, insert the missing.
    Diff,
}

impl FromStr for SyncStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(SyncStrategy::Replace),
            "diff" => Ok(SyncStrategy::Diff),
            other => Err(Error::Config(format!(
                "unknown sync strategy '{}': expected 'replace' or 'diff'",
                other
            ))),
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Replace => f.write_str("replace"),
            SyncStrategy::Diff => f.write_str("diff"),
        }
    }
}

/// Reconciles the tag links and media rows of a release.
#[derive(Clone)]
pub struct RelationSynchronizer {
    store: Arc<dyn ReleaseStore>,
    tags: TagUpsertService,
    strategy: SyncStrategy,
}

impl RelationSynchronizer {
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self {
            tags: TagUpsertService::new(store.clone()),
            store,
            strategy: SyncStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    /// Make the release's tag links equal `desired`.
    ///
    /// Each draft is upserted (and promoted to `Persisted`) before it is
    /// linked. Drafts that resolve to an id already linked in this call are
    /// not linked twice.
    pub async fn sync_tags(&self, release_id: Uuid, desired: &mut [TagDraft]) -> Result<()> {
        debug!(
            subsystem = "engine",
            component = "relation_sync",
            op = "sync_tags",
            release_id = %release_id,
            tag_count = desired.len(),
            strategy = %self.strategy,
            "Synchronizing tags"
        );

        let result = match self.strategy {
            SyncStrategy::Replace => self.replace_tags(release_id, desired).await,
            SyncStrategy::Diff => self.diff_tags(release_id, desired).await,
        };

        if let Err(ref e) = result {
            warn!(
                subsystem = "engine",
                component = "relation_sync",
                op = "sync_tags",
                release_id = %release_id,
                error = %e,
                "Tag sync aborted, links may be partial"
            );
        }
        result
    }

    async fn replace_tags(&self, release_id: Uuid, desired: &mut [TagDraft]) -> Result<()> {
        self.store.delete_tag_links(release_id).await?;

        let mut linked = HashSet::new();
        for draft in desired.iter_mut() {
            let tag = self.tags.upsert(draft).await?;
            if !linked.insert(tag.id) {
                continue;
            }
            self.store.insert_tag_link(release_id, tag.id).await?;
            trace!(
                subsystem = "engine",
                component = "relation_sync",
                op = "sync_tags",
                release_id = %release_id,
                tag_id = %tag.id,
                "Tag linked"
            );
        }
        Ok(())
    }

    async fn diff_tags(&self, release_id: Uuid, desired: &mut [TagDraft]) -> Result<()> {
        let current: HashSet<Uuid> = self
            .store
            .linked_tag_ids(release_id)
            .await?
            .into_iter()
            .collect();

        let mut wanted = Vec::with_capacity(desired.len());
        for draft in desired.iter_mut() {
            let tag = self.tags.upsert(draft).await?;
            if !wanted.contains(&tag.id) {
                wanted.push(tag.id);
            }
        }

        for stale in current.iter().filter(|id| !wanted.contains(*id)) {
            self.store.delete_tag_link(release_id, *stale).await?;
            trace!(
                subsystem = "engine",
                component = "relation_sync",
                op = "sync_tags",
                release_id = %release_id,
                tag_id = %stale,
                "Tag unlinked"
            );
        }
        for missing in wanted.iter().filter(|id| !current.contains(*id)) {
            self.store.insert_tag_link(release_id, *missing).await?;
            trace!(
                subsystem = "engine",
                component = "relation_sync",
                op = "sync_tags",
                release_id = %release_id,
                tag_id = %missing,
                "Tag linked"
            );
        }
        Ok(())
    }

    /// Replace the release's media rows with `desired`, keeping order.
    ///
    /// One delete followed by one bulk insert.
    pub async fn sync_media(&self, release_id: Uuid, desired: &[MediaDraft]) -> Result<()> {
        debug!(
            subsystem = "engine",
            component = "relation_sync",
            op = "sync_media",
            release_id = %release_id,
            media_count = desired.len(),
            "Synchronizing media"
        );

        self.store.delete_media(release_id).await?;
        if desired.is_empty() {
            return Ok(());
        }

        let rows: Vec<MediaRow> = desired
            .iter()
            .map(|m| MediaRow {
                release_id,
                media_type: m.media_type,
                url: m.url.clone(),
            })
            .collect();
        self.store.insert_media(&rows).await.inspect_err(|e| {
            warn!(
                subsystem = "engine",
                component = "relation_sync",
                op = "sync_media",
                release_id = %release_id,
                error = %e,
                "Media insert failed after delete, release has no media"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityId;
    use crate::memory::{MemoryReleaseStore, StoreOp};
    use crate::models::{Category, MediaType, ReleaseFields};
    use chrono::Utc;

    async fn setup(strategy: SyncStrategy) -> (MemoryReleaseStore, RelationSynchronizer, Uuid) {
        let store = MemoryReleaseStore::new();
        let sync = RelationSynchronizer::new(Arc::new(store.clone())).with_strategy(strategy);
        let release_id = store
            .insert_release(&ReleaseFields {
                title: "v1".into(),
                description: String::new(),
                category: Category::Feature,
                datetime: Utc::now(),
            })
            .await
            .unwrap();
        (store, sync, release_id)
    }

    async fn linked_names(store: &MemoryReleaseStore, release_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = store
            .list_tag_links()
            .await
            .unwrap()
            .into_iter()
            .filter(|l| l.release_id == release_id)
            .map(|l| l.tag.name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("replace".parse::<SyncStrategy>().unwrap(), SyncStrategy::Replace);
        assert_eq!(" Diff ".parse::<SyncStrategy>().unwrap(), SyncStrategy::Diff);
        assert!("merge".parse::<SyncStrategy>().is_err());
    }

    #[tokio::test]
    async fn test_sync_tags_links_exactly_desired() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        let mut tags = vec![TagDraft::new("perf", "#fff"), TagDraft::new("ui", "#0af")];

        sync.sync_tags(r, &mut tags).await.unwrap();

        assert_eq!(linked_names(&store, r).await, vec!["perf", "ui"]);
        assert!(tags.iter().all(|t| !t.id.as_ref().unwrap().is_pending()));
    }

    #[tokio::test]
    async fn test_sync_tags_clears_first() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        sync.sync_tags(r, &mut [TagDraft::new("old", "#000")])
            .await
            .unwrap();

        sync.sync_tags(r, &mut [TagDraft::new("new", "#111")])
            .await
            .unwrap();

        assert_eq!(linked_names(&store, r).await, vec!["new"]);
        // The unlinked tag row itself survives.
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_tags_skips_duplicate_ids() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        let tag_id = store.insert_tag("perf", "#fff").await.unwrap();
        let persisted = TagDraft {
            id: Some(EntityId::Persisted(tag_id)),
            name: "perf".into(),
            color: "#fff".into(),
        };

        sync.sync_tags(r, &mut [persisted.clone(), persisted])
            .await
            .unwrap();

        assert_eq!(store.link_count(r).await, 1);
    }

    #[tokio::test]
    async fn test_sync_tags_failure_leaves_prefix_and_retry_converges() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        let mut tags = vec![
            TagDraft::new("a", "#000"),
            TagDraft::new("b", "#000"),
            TagDraft::new("c", "#000"),
        ];
        store.fail_nth(StoreOp::InsertTagLink, 2).await;

        let err = sync.sync_tags(r, &mut tags).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(linked_names(&store, r).await, vec!["a"]);
        // Processing stopped at the failure: "c" was never upserted.
        assert!(tags[2].id.is_none());

        sync.sync_tags(r, &mut tags).await.unwrap();
        assert_eq!(linked_names(&store, r).await, vec!["a", "b", "c"]);
        // "a" and "b" were promoted on the first pass and updated on the retry.
        assert_eq!(store.list_tags().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_sync_tags_does_not_touch_other_releases() {
        let (store, sync, r1) = setup(SyncStrategy::Replace).await;
        let r2 = store
            .insert_release(&ReleaseFields {
                title: "v2".into(),
                description: String::new(),
                category: Category::Bugfix,
                datetime: Utc::now(),
            })
            .await
            .unwrap();
        sync.sync_tags(r1, &mut [TagDraft::new("perf", "#fff")])
            .await
            .unwrap();
        sync.sync_tags(r2, &mut [TagDraft::new("perf", "#fff")])
            .await
            .unwrap();

        sync.sync_tags(r2, &mut []).await.unwrap();

        assert_eq!(linked_names(&store, r1).await, vec!["perf"]);
        assert!(linked_names(&store, r2).await.is_empty());
    }

    #[tokio::test]
    async fn test_diff_only_touches_changed_links() {
        let (store, sync, r) = setup(SyncStrategy::Diff).await;
        let mut tags = vec![TagDraft::new("keep", "#000"), TagDraft::new("drop", "#000")];
        sync.sync_tags(r, &mut tags).await.unwrap();
        store.clear_calls().await;

        let mut next = vec![tags[0].clone(), TagDraft::new("add", "#000")];
        sync.sync_tags(r, &mut next).await.unwrap();

        assert_eq!(linked_names(&store, r).await, vec!["add", "keep"]);
        assert_eq!(store.call_count(StoreOp::DeleteTagLinks).await, 0);
        assert_eq!(store.call_count(StoreOp::DeleteTagLink).await, 1);
        assert_eq!(store.call_count(StoreOp::InsertTagLink).await, 1);
    }

    #[tokio::test]
    async fn test_diff_with_empty_set_unlinks_all() {
        let (store, sync, r) = setup(SyncStrategy::Diff).await;
        sync.sync_tags(r, &mut [TagDraft::new("a", "#000"), TagDraft::new("b", "#000")])
            .await
            .unwrap();

        sync.sync_tags(r, &mut []).await.unwrap();

        assert_eq!(store.link_count(r).await, 0);
    }

    #[tokio::test]
    async fn test_sync_media_replaces_in_order() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        sync.sync_media(r, &[MediaDraft::new(MediaType::Image, "https://cdn/old.png")])
            .await
            .unwrap();

        let desired = vec![
            MediaDraft::new(MediaType::Video, "https://cdn/b.mp4"),
            MediaDraft::new(MediaType::Image, "https://cdn/a.png"),
        ];
        sync.sync_media(r, &desired).await.unwrap();

        let urls: Vec<String> = store
            .list_media()
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.release_id == r)
            .map(|m| m.url)
            .collect();
        assert_eq!(urls, vec!["https://cdn/b.mp4", "https://cdn/a.png"]);
    }

    #[tokio::test]
    async fn test_sync_media_is_one_delete_and_one_insert() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        store.clear_calls().await;
        let desired = vec![
            MediaDraft::new(MediaType::Image, "https://cdn/1.png"),
            MediaDraft::new(MediaType::Image, "https://cdn/2.png"),
            MediaDraft::new(MediaType::Image, "https://cdn/3.png"),
        ];

        sync.sync_media(r, &desired).await.unwrap();

        let ops: Vec<StoreOp> = store.calls().await.into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![StoreOp::DeleteMedia, StoreOp::InsertMedia]);
    }

    #[tokio::test]
    async fn test_sync_media_empty_skips_insert() {
        let (store, sync, r) = setup(SyncStrategy::Replace).await;
        sync.sync_media(r, &[MediaDraft::new(MediaType::Image, "https://cdn/1.png")])
            .await
            .unwrap();
        store.clear_calls().await;

        sync.sync_media(r, &[]).await.unwrap();

        assert_eq!(store.media_count(r).await, 0);
        assert_eq!(store.call_count(StoreOp::InsertMedia).await, 0);
    }
}
