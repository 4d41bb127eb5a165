//! Filesystem blob storage for media uploads.
//!
//! Files land at `{base_path}/{key}` and are served from
//! `{public_base_url}/{key}` by whatever fronts the directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relnote_db::FilesystemBlobStorage;
//! use relnote_core::{upload_media, MediaType};
//!
//! let storage = FilesystemBlobStorage::new("/var/relnote/media", "https://cdn.example.com");
//! storage.validate().await?;
//! let draft = upload_media(&storage, "shot.png", &bytes, MediaType::Image).await?;
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use relnote_core::{BlobStorage, Error, Result};

/// Blob storage backed by a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStorage {
    /// Create a storage rooted at `base_path`, publishing under `public_base_url`.
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key to a path under the base directory.
    ///
    /// Keys must be relative and may not climb out with `..`.
    pub fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::InvalidInput(format!("invalid blob key '{}'", key)));
        }
        Ok(self.base_path.join(relative))
    }

    /// Check that the directory accepts writes, reads and deletes.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl BlobStorage for FilesystemBlobStorage {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        let full_path = self.full_path(key)?;
        debug!(
            subsystem = "blob",
            component = "file_storage",
            blob_key = %key,
            full_path = %full_path.display(),
            size = data.len(),
            content_type,
            "file_storage: put"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(
                    parent = %parent.display(),
                    error = %e,
                    "file_storage: create_dir_all failed"
                );
                e
            })?;
        }

        // Atomic write: temp file + rename
        let mut temp_name = full_path.clone().into_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(
                temp_path = %temp_path.display(),
                error = %e,
                "file_storage: File::create failed"
            );
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(
                from = %temp_path.display(),
                to = %full_path.display(),
                error = %e,
                "file_storage: rename failed"
            );
            e
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
