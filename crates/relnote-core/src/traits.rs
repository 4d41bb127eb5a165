//! Core traits for relnote abstractions.
//!
//! These traits define the collaborators the synchronization engine talks
//! to. Every method is an independent call: no transaction spans two of
//! them, and the engine never assumes one does.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// RELEASE STORE
// =============================================================================

/// Row-level access to the `releases`, `tags`, `release_tags` and `media`
/// tables.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    // ---- releases ----

    /// List every release row.
    async fn list_releases(&self) -> Result<Vec<ReleaseRow>>;

    /// Fetch one release row.
    async fn get_release(&self, id: Uuid) -> Result<Option<ReleaseRow>>;

    /// Insert a release row and return the generated id.
    async fn insert_release(&self, fields: &ReleaseFields) -> Result<Uuid>;

    /// Update a release row in place.
    ///
    /// Returns `Error::ReleaseNotFound` if no row has this id.
    async fn update_release(&self, id: Uuid, fields: &ReleaseFields) -> Result<()>;

    /// Delete a release row.
    ///
    /// Returns `Error::ReleaseNotFound` if no row has this id.
    async fn delete_release(&self, id: Uuid) -> Result<()>;

    // ---- tags ----

    /// List every tag row.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Insert a tag row and return the generated id.
    async fn insert_tag(&self, name: &str, color: &str) -> Result<Uuid>;

    /// Update a tag row in place.
    ///
    /// Returns `Error::TagNotFound` if no row has this id.
    async fn update_tag(&self, id: Uuid, name: &str, color: &str) -> Result<()>;

    // ---- release_tags ----

    /// List every join row together with the tag it points at.
    async fn list_tag_links(&self) -> Result<Vec<TagLink>>;

    /// Tag ids currently linked to one release.
    async fn linked_tag_ids(&self, release_id: Uuid) -> Result<Vec<Uuid>>;

    /// Insert one join row.
    async fn insert_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Delete one join row.
    async fn delete_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Delete every join row of one release.
    async fn delete_tag_links(&self, release_id: Uuid) -> Result<()>;

    // ---- media ----

    /// List every media row in insertion order.
    async fn list_media(&self) -> Result<Vec<MediaRow>>;

    /// Insert media rows in one call, preserving order.
    async fn insert_media(&self, rows: &[MediaRow]) -> Result<()>;

    /// Delete every media row of one release.
    async fn delete_media(&self, release_id: Uuid) -> Result<()>;
}

// =============================================================================
// BLOB STORAGE
// =============================================================================

/// Object storage for media files.
///
/// Only the returned public URL is ever recorded in the store.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `key` and return its public URL.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Public URL for a key, whether or not it exists.
    fn public_url(&self, key: &str) -> String;
}
