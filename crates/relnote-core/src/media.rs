//! Media upload helper.
//!
//! Uploads go to a [`BlobStorage`] first; only the returned URL ends up in a
//! [`MediaDraft`]. Keys are `media/<uuid v7>/<sanitized file name>` so two
//! uploads of the same file name never overwrite each other.

use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{MediaDraft, MediaType};
use crate::traits::BlobStorage;

/// Maximum length of the file name part of a key.
pub const MAX_FILE_NAME_LEN: usize = 128;

/// Make a file name safe to use as the last segment of a URL path.
///
/// Strips directories, keeps ASCII alphanumerics, `.`, `-` and `_`, and
/// replaces everything else with `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        return "unnamed".to_string();
    }

    if sanitized.len() > MAX_FILE_NAME_LEN {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let ext = &sanitized[dot_pos..];
            if ext.len() < MAX_FILE_NAME_LEN {
                return format!("{}{}", &sanitized[..MAX_FILE_NAME_LEN - ext.len()], ext);
            }
        }
        return sanitized[..MAX_FILE_NAME_LEN].to_string();
    }

    sanitized.to_string()
}

/// Guess a content type from the file extension.
pub fn content_type_for(file_name: &str, media_type: MediaType) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match (media_type, ext.as_str()) {
        (MediaType::Image, "png") => "image/png",
        (MediaType::Image, "jpg" | "jpeg") => "image/jpeg",
        (MediaType::Image, "gif") => "image/gif",
        (MediaType::Image, "webp") => "image/webp",
        (MediaType::Image, "svg") => "image/svg+xml",
        (MediaType::Video, "mp4") => "video/mp4",
        (MediaType::Video, "webm") => "video/webm",
        (MediaType::Video, "mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Storage key for a new upload.
pub fn media_key(file_name: &str) -> String {
    format!("media/{}/{}", Uuid::now_v7(), sanitize_file_name(file_name))
}

/// Upload a file and return a draft pointing at its public URL.
pub async fn upload_media(
    storage: &dyn BlobStorage,
    file_name: &str,
    data: &[u8],
    media_type: MediaType,
) -> Result<MediaDraft> {
    if data.is_empty() {
        return Err(Error::InvalidInput(format!(
            "refusing to upload empty file '{}'",
            file_name
        )));
    }

    let key = media_key(file_name);
    let url = storage
        .put(&key, data, content_type_for(file_name, media_type))
        .await?;

    info!(
        subsystem = "blob",
        component = "upload",
        blob_key = %key,
        size = data.len(),
        media_type = %media_type,
        "Media uploaded"
    );
    Ok(MediaDraft::new(media_type, url))
}
