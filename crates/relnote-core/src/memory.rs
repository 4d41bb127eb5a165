//! In-memory release store.
//!
//! Mirrors the relational schema closely enough to exercise the engine
//! without a database: generated ids, a primary key on join rows, and
//! foreign keys without cascade. Every call is recorded, and individual
//! calls can be made to fail to reproduce a network error mid-sequence.
//!
//! The call log grows with every call. Long-lived stores built for tooling
//! rather than tests should use [`MemoryReleaseStore::without_call_log`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relnote_core::memory::{MemoryReleaseStore, StoreOp};
//!
//! let store = MemoryReleaseStore::new();
//! // The second tag link inserted from now on fails once.
//! store.fail_nth(StoreOp::InsertTagLink, 2).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::ReleaseStore;

/// Store operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListReleases,
    GetRelease,
    InsertRelease,
    UpdateRelease,
    DeleteRelease,
    ListTags,
    InsertTag,
    UpdateTag,
    ListTagLinks,
    LinkedTagIds,
    InsertTagLink,
    DeleteTagLink,
    DeleteTagLinks,
    ListMedia,
    InsertMedia,
    DeleteMedia,
}

impl StoreOp {
    /// True for operations that write.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            StoreOp::ListReleases
                | StoreOp::GetRelease
                | StoreOp::ListTags
                | StoreOp::ListTagLinks
                | StoreOp::LinkedTagIds
                | StoreOp::ListMedia
        )
    }
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub release_id: Option<Uuid>,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    countdown: usize,
}

#[derive(Debug, Default)]
struct Tables {
    releases: Vec<ReleaseRow>,
    tags: Vec<Tag>,
    release_tags: Vec<(Uuid, Uuid)>,
    media: Vec<MediaRow>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    calls: Vec<StoreCall>,
    call_log_disabled: bool,
    faults: Vec<Fault>,
}

/// In-memory implementation of [`ReleaseStore`].
#[derive(Clone, Default)]
pub struct MemoryReleaseStore {
    state: Arc<Mutex<State>>,
}

impl MemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that records no calls. Fault injection still works.
    pub fn without_call_log() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                call_log_disabled: true,
                ..State::default()
            })),
        }
    }

    /// Make the `n`th call of `op` from now on fail once (1-based).
    ///
    /// The failing call is recorded but has no effect on the tables.
    pub async fn fail_nth(&self, op: StoreOp, n: usize) {
        self.state.lock().await.faults.push(Fault {
            op,
            countdown: n.max(1),
        });
    }

    /// All calls made so far.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Number of calls of one operation.
    pub async fn call_count(&self, op: StoreOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Number of join rows pointing at a release.
    pub async fn link_count(&self, release_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .tables
            .release_tags
            .iter()
            .filter(|(r, _)| *r == release_id)
            .count()
    }

    /// Number of media rows owned by a release.
    pub async fn media_count(&self, release_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .tables
            .media
            .iter()
            .filter(|m| m.release_id == release_id)
            .count()
    }
}

impl State {
    fn enter(&mut self, op: StoreOp, release_id: Option<Uuid>) -> Result<()> {
        trace!(op = ?op, release_id = ?release_id, "memory store call");
        if !self.call_log_disabled {
            self.calls.push(StoreCall { op, release_id });
        }

        if let Some(pos) = self.faults.iter().position(|f| f.op == op) {
            let fault = &mut self.faults[pos];
            fault.countdown -= 1;
            if fault.countdown == 0 {
                self.faults.remove(pos);
                return Err(Error::Storage(format!("injected failure on {:?}", op)));
            }
        }
        Ok(())
    }
}

impl Tables {
    fn release_exists(&self, id: Uuid) -> bool {
        self.releases.iter().any(|r| r.id == id)
    }

    fn tag(&self, id: Uuid) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }
}

#[async_trait]
impl ReleaseStore for MemoryReleaseStore {
    async fn list_releases(&self) -> Result<Vec<ReleaseRow>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::ListReleases, None)?;
        Ok(state.tables.releases.clone())
    }

    async fn get_release(&self, id: Uuid) -> Result<Option<ReleaseRow>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::GetRelease, Some(id))?;
        Ok(state.tables.releases.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_release(&self, fields: &ReleaseFields) -> Result<Uuid> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::InsertRelease, None)?;
        let id = Uuid::new_v4();
        state.tables.releases.push(ReleaseRow {
            id,
            fields: fields.clone(),
        });
        Ok(id)
    }

    async fn update_release(&self, id: Uuid, fields: &ReleaseFields) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::UpdateRelease, Some(id))?;
        let row = state
            .tables
            .releases
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::ReleaseNotFound(id))?;
        row.fields = fields.clone();
        Ok(())
    }

    async fn delete_release(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::DeleteRelease, Some(id))?;
        let tables = &mut state.tables;
        if !tables.release_exists(id) {
            return Err(Error::ReleaseNotFound(id));
        }
        if tables.release_tags.iter().any(|(r, _)| *r == id) {
            return Err(Error::Storage(
                "delete on releases violates foreign key on release_tags".to_string(),
            ));
        }
        if tables.media.iter().any(|m| m.release_id == id) {
            return Err(Error::Storage(
                "delete on releases violates foreign key on media".to_string(),
            ));
        }
        tables.releases.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::ListTags, None)?;
        Ok(state.tables.tags.clone())
    }

    async fn insert_tag(&self, name: &str, color: &str) -> Result<Uuid> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::InsertTag, None)?;
        let id = Uuid::new_v4();
        state.tables.tags.push(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
        });
        Ok(id)
    }

    async fn update_tag(&self, id: Uuid, name: &str, color: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::UpdateTag, None)?;
        let tag = state
            .tables
            .tags
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TagNotFound(id))?;
        tag.name = name.to_string();
        tag.color = color.to_string();
        Ok(())
    }

    async fn list_tag_links(&self) -> Result<Vec<TagLink>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::ListTagLinks, None)?;
        let tables = &state.tables;
        Ok(tables
            .release_tags
            .iter()
            .filter_map(|(release_id, tag_id)| {
                tables.tag(*tag_id).map(|tag| TagLink {
                    release_id: *release_id,
                    tag: tag.clone(),
                })
            })
            .collect())
    }

    async fn linked_tag_ids(&self, release_id: Uuid) -> Result<Vec<Uuid>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::LinkedTagIds, Some(release_id))?;
        Ok(state
            .tables
            .release_tags
            .iter()
            .filter(|(r, _)| *r == release_id)
            .map(|(_, t)| *t)
            .collect())
    }

    async fn insert_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::InsertTagLink, Some(release_id))?;
        let tables = &mut state.tables;
        if !tables.release_exists(release_id) || tables.tag(tag_id).is_none() {
            return Err(Error::Storage(
                "insert on release_tags violates foreign key".to_string(),
            ));
        }
        if tables.release_tags.contains(&(release_id, tag_id)) {
            return Err(Error::Storage(
                "duplicate key value violates primary key on release_tags".to_string(),
            ));
        }
        tables.release_tags.push((release_id, tag_id));
        Ok(())
    }

    async fn delete_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::DeleteTagLink, Some(release_id))?;
        state
            .tables
            .release_tags
            .retain(|link| *link != (release_id, tag_id));
        Ok(())
    }

    async fn delete_tag_links(&self, release_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::DeleteTagLinks, Some(release_id))?;
        state
            .tables
            .release_tags
            .retain(|(r, _)| *r != release_id);
        Ok(())
    }

    async fn list_media(&self) -> Result<Vec<MediaRow>> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::ListMedia, None)?;
        Ok(state.tables.media.clone())
    }

    async fn insert_media(&self, rows: &[MediaRow]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::InsertMedia, rows.first().map(|m| m.release_id))?;
        let tables = &mut state.tables;
        if rows.iter().any(|m| !tables.release_exists(m.release_id)) {
            return Err(Error::Storage(
                "insert on media violates foreign key".to_string(),
            ));
        }
        tables.media.extend(rows.iter().cloned());
        Ok(())
    }

    async fn delete_media(&self, release_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state.enter(StoreOp::DeleteMedia, Some(release_id))?;
        state.tables.media.retain(|m| m.release_id != release_id);
        Ok(())
    }
}
