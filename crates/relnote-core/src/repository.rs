//! Release repository: fetch, save and delete of full release graphs.
//!
//! The only component callers talk to. A save is a fixed sequence of
//! independent store calls:
//!
//! 1. validate the draft (no store call before this passes)
//! 2. resolve identity, then insert or update the `releases` row
//! 3. sync tag links, if the draft carries a tag list
//! 4. sync media, if the draft carries a media list
//! 5. re-read the whole graph
//!
//! Any failure returns immediately with the earlier steps left in place.
//! Drafts are updated as their rows are written (release and tag ids are
//! promoted to `Persisted`), so handing the same draft back to [`save`]
//! after a failure continues from stored state instead of creating a
//! second release.
//!
//! Concurrent saves of the same release are not serialized here.
//!
//! [`save`]: ReleaseRepository::save

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identity::{resolve, EntityId, Resolution};
use crate::models::{Media, Release, ReleaseDraft, ReleaseRow, Tag};
use crate::sync::{RelationSynchronizer, SyncStrategy};
use crate::traits::ReleaseStore;

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// Id of the saved release.
    pub release_id: Uuid,
    /// True when this save inserted the release row.
    pub created: bool,
    /// Snapshot read after all writes completed.
    pub releases: Vec<Release>,
}

impl SaveOutcome {
    /// The saved release as read back from the store.
    pub fn release(&self) -> Option<&Release> {
        self.releases.iter().find(|r| r.id == self.release_id)
    }
}

/// Facade over a [`ReleaseStore`].
#[derive(Clone)]
pub struct ReleaseRepository {
    store: Arc<dyn ReleaseStore>,
    sync: RelationSynchronizer,
}

impl ReleaseRepository {
    /// Create a repository with the default sync strategy.
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self {
            sync: RelationSynchronizer::new(store.clone()),
            store,
        }
    }

    /// Choose how tag links are reconciled.
    pub fn with_sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.sync = self.sync.with_strategy(strategy);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ReleaseStore> {
        &self.store
    }

    /// Read every release with its tags and media.
    ///
    /// A fresh read on every call. Order is whatever the store returns.
    pub async fn fetch_all(&self) -> Result<Vec<Release>> {
        let start = Instant::now();

        let rows = self.store.list_releases().await?;
        let links = self.store.list_tag_links().await?;
        let media = self.store.list_media().await?;

        let mut tags_by_release: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for link in links {
            tags_by_release
                .entry(link.release_id)
                .or_default()
                .push(link.tag);
        }
        let mut media_by_release: HashMap<Uuid, Vec<Media>> = HashMap::new();
        for row in media {
            media_by_release.entry(row.release_id).or_default().push(Media {
                media_type: row.media_type,
                url: row.url,
            });
        }

        let releases: Vec<Release> = rows
            .into_iter()
            .map(|row| {
                let tags = tags_by_release.remove(&row.id).unwrap_or_default();
                let media = media_by_release.remove(&row.id).unwrap_or_default();
                assemble(row, tags, media)
            })
            .collect();

        debug!(
            subsystem = "engine",
            component = "repository",
            op = "fetch_all",
            release_count = releases.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched release graph"
        );
        Ok(releases)
    }

    /// Read one release with its tags and media.
    pub async fn fetch(&self, id: Uuid) -> Result<Release> {
        let row = self
            .store
            .get_release(id)
            .await?
            .ok_or(Error::ReleaseNotFound(id))?;

        let tags = self
            .store
            .list_tag_links()
            .await?
            .into_iter()
            .filter(|l| l.release_id == id)
            .map(|l| l.tag)
            .collect();
        let media = self
            .store
            .list_media()
            .await?
            .into_iter()
            .filter(|m| m.release_id == id)
            .map(|m| Media {
                media_type: m.media_type,
                url: m.url,
            })
            .collect();

        Ok(assemble(row, tags, media))
    }

    /// Persist a draft and return the post-write snapshot.
    pub async fn save(&self, draft: &mut ReleaseDraft) -> Result<SaveOutcome> {
        let start = Instant::now();
        draft.validate()?;

        let fields = draft.fields();
        let (release_id, created) = match resolve(draft.id.as_ref()) {
            Resolution::New => {
                let id = self.store.insert_release(&fields).await?;
                debug!(
                    subsystem = "engine",
                    component = "repository",
                    op = "save",
                    release_id = %id,
                    draft_id = ?draft.id.as_ref().map(|d| d.to_string()),
                    "Release row inserted"
                );
                draft.id = Some(EntityId::Persisted(id));
                (id, true)
            }
            Resolution::Existing(id) => {
                self.store.update_release(id, &fields).await?;
                debug!(
                    subsystem = "engine",
                    component = "repository",
                    op = "save",
                    release_id = %id,
                    "Release row updated"
                );
                (id, false)
            }
        };

        if let Some(tags) = draft.tags.as_mut() {
            self.sync
                .sync_tags(release_id, tags)
                .await
                .inspect_err(|e| partial_save(release_id, "tags", e))?;
        }
        if let Some(media) = draft.media.as_ref() {
            self.sync
                .sync_media(release_id, media)
                .await
                .inspect_err(|e| partial_save(release_id, "media", e))?;
        }

        let releases = self.fetch_all().await?;

        info!(
            subsystem = "engine",
            component = "repository",
            op = "save",
            release_id = %release_id,
            created,
            duration_ms = start.elapsed().as_millis() as u64,
            "Release saved"
        );
        Ok(SaveOutcome {
            release_id,
            created,
            releases,
        })
    }

    /// Delete a release with its tag links and media.
    ///
    /// Dependent rows go first so no reader ever sees a link or media row
    /// whose release is gone. Tag rows are never deleted.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let start = Instant::now();

        self.store.delete_tag_links(id).await?;
        self.store.delete_media(id).await?;
        self.store.delete_release(id).await?;

        info!(
            subsystem = "engine",
            component = "repository",
            op = "delete",
            release_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Release deleted"
        );
        Ok(())
    }
}

fn assemble(row: ReleaseRow, tags: Vec<Tag>, media: Vec<Media>) -> Release {
    Release {
        id: row.id,
        title: row.fields.title,
        description: row.fields.description,
        category: row.fields.category,
        datetime: row.fields.datetime,
        tags,
        media,
    }
}

fn partial_save(release_id: Uuid, relation: &str, e: &Error) {
    warn!(
        subsystem = "engine",
        component = "repository",
        op = "save",
        release_id = %release_id,
        relation,
        error = %e,
        "Save aborted after release row was written"
    );
}
