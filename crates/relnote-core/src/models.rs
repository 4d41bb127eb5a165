//! Core data models for relnote.
//!
//! Persisted entities (`Release`, `Tag`, `Media`) are what a snapshot read
//! returns. Drafts (`ReleaseDraft`, `TagDraft`, `MediaDraft`) are what
//! callers submit to be saved; they carry an explicit [`EntityId`] instead
//! of encoding "not yet persisted" in the identifier string.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identity::EntityId;

// =============================================================================
// CATEGORY
// =============================================================================

/// Release category.
///
/// The three built-in categories serialize as lowercase strings; any other
/// string is a custom category carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Feature,
    Bugfix,
    Enhancement,
    Custom(String),
}

impl Category {
    /// Wire/storage form of the category.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Feature => "feature",
            Category::Bugfix => "bugfix",
            Category::Enhancement => "enhancement",
            Category::Custom(value) => value,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "feature" => Category::Feature,
            "bugfix" => Category::Bugfix,
            "enhancement" => Category::Enhancement,
            _ => Category::Custom(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Custom(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// MEDIA TYPE
// =============================================================================

/// Kind of media attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(Error::InvalidInput(format!(
                "unknown media type '{}': expected 'image' or 'video'",
                other
            ))),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PERSISTED ENTITIES
// =============================================================================

/// A shared, named label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// A media attachment as it appears inside a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
}

/// A release with its tags and media, reconstructed from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub datetime: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub media: Vec<Media>,
}

impl Release {
    /// Turn a snapshot release back into an editable draft.
    ///
    /// Every id in the draft is `Persisted`, so saving it unchanged is an
    /// update of the same rows.
    pub fn to_draft(&self) -> ReleaseDraft {
        ReleaseDraft {
            id: Some(EntityId::Persisted(self.id)),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            datetime: self.datetime,
            tags: Some(self.tags.iter().map(TagDraft::from).collect()),
            media: Some(self.media.iter().map(MediaDraft::from).collect()),
        }
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// Scalar columns of the `releases` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseFields {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub datetime: DateTime<Utc>,
}

/// A row of the `releases` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRow {
    pub id: Uuid,
    pub fields: ReleaseFields,
}

/// A `release_tags` row joined with the tag it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct TagLink {
    pub release_id: Uuid,
    pub tag: Tag,
}

/// A row of the `media` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub release_id: Uuid,
    pub media_type: MediaType,
    pub url: String,
}

// =============================================================================
// DRAFTS
// =============================================================================

/// A tag as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    pub color: String,
}

impl TagDraft {
    /// A tag that has never been stored.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: color.into(),
        }
    }
}

impl From<&Tag> for TagDraft {
    fn from(tag: &Tag) -> Self {
        Self {
            id: Some(EntityId::Persisted(tag.id)),
            name: tag.name.clone(),
            color: tag.color.clone(),
        }
    }
}

/// A media attachment as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDraft {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
}

impl MediaDraft {
    pub fn new(media_type: MediaType, url: impl Into<String>) -> Self {
        Self {
            media_type,
            url: url.into(),
        }
    }
}

impl From<&Media> for MediaDraft {
    fn from(media: &Media) -> Self {
        Self {
            media_type: media.media_type,
            url: media.url.clone(),
        }
    }
}

/// A release as submitted by a caller.
///
/// `tags` and `media` follow partial-update semantics: `None` leaves the
/// stored relation untouched, `Some(vec![])` clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagDraft>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaDraft>>,
}

impl ReleaseDraft {
    /// Start a new release with a freshly minted placeholder id.
    pub fn new(title: impl Into<String>, category: Category, datetime: DateTime<Utc>) -> Self {
        Self {
            id: Some(EntityId::new_pending()),
            title: title.into(),
            description: String::new(),
            category,
            datetime,
            tags: None,
            media: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<TagDraft>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_media(mut self, media: Vec<MediaDraft>) -> Self {
        self.media = Some(media);
        self
    }

    /// Scalar columns written to the `releases` table.
    pub fn fields(&self) -> ReleaseFields {
        ReleaseFields {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            datetime: self.datetime,
        }
    }

    /// Reject input that must never reach the store.
    ///
    /// Runs before any store call so an invalid draft leaves no partial
    /// writes behind.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("release title is required".to_string()));
        }
        if self.category.as_str().trim().is_empty() {
            return Err(Error::InvalidInput(
                "release category cannot be empty".to_string(),
            ));
        }
        for tag in self.tags.iter().flatten() {
            if tag.name.trim().is_empty() {
                return Err(Error::InvalidInput("tag name cannot be empty".to_string()));
            }
        }
        for media in self.media.iter().flatten() {
            if media.url.trim().is_empty() {
                return Err(Error::InvalidInput("media url cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ReleaseDraft {
        ReleaseDraft::new("v1.2", Category::Feature, Utc::now())
    }

    #[test]
    fn test_category_builtin_roundtrip() {
        for (s, c) in [
            ("feature", Category::Feature),
            ("bugfix", Category::Bugfix),
            ("enhancement", Category::Enhancement),
        ] {
            assert_eq!(Category::from(s), c);
            assert_eq!(c.as_str(), s);
        }
    }

    #[test]
    fn test_category_custom_is_verbatim() {
        let c = Category::from("Security Advisory");
        assert_eq!(c, Category::Custom("Security Advisory".to_string()));
        assert_eq!(c.to_string(), "Security Advisory");
    }

    #[test]
    fn test_category_serde_as_plain_string() {
        let json = serde_json::to_string(&Category::Bugfix).unwrap();
        assert_eq!(json, "\"bugfix\"");
        let parsed: Category = serde_json::from_str("\"docs\"").unwrap();
        assert_eq!(parsed, Category::Custom("docs".to_string()));
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!("image".parse::<MediaType>().unwrap(), MediaType::Image);
        assert_eq!("video".parse::<MediaType>().unwrap(), MediaType::Video);
        assert!("gif".parse::<MediaType>().unwrap_err().is_validation());
    }

    #[test]
    fn test_media_serializes_type_field() {
        let json = serde_json::to_value(MediaDraft::new(MediaType::Video, "https://x/v.mp4"))
            .unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["url"], "https://x/v.mp4");
    }

    #[test]
    fn test_new_draft_is_pending() {
        let d = draft();
        assert!(matches!(d.id, Some(EntityId::Pending { .. })));
        assert!(d.tags.is_none());
        assert!(d.media.is_none());
    }

    #[test]
    fn test_validate_accepts_minimal_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert!(d.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_blank_tag_name() {
        let d = draft().with_tags(vec![TagDraft::new("", "#fff")]);
        assert!(d.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_blank_media_url() {
        let d = draft().with_media(vec![MediaDraft::new(MediaType::Image, " ")]);
        assert!(d.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_draft_with_empty_ids_deserializes_as_new() {
        let json = r##"{
            "id": "",
            "title": "v1.3",
            "category": "bugfix",
            "datetime": "2024-03-01T12:00:00Z",
            "tags": [{"id": "", "name": "perf", "color": "#fff"}]
        }"##;
        let d: ReleaseDraft = serde_json::from_str(json).unwrap();
        assert!(matches!(d.id, Some(EntityId::Pending { .. })));
        assert_eq!(crate::identity::resolve(d.id.as_ref()), crate::identity::Resolution::New);
        let tags = d.tags.unwrap();
        assert!(tags[0].id.as_ref().is_some_and(EntityId::is_pending));
    }

    #[test]
    fn test_draft_deserializes_wire_placeholder() {
        let json = r##"{
            "id": "new-1700000000000",
            "title": "v1.2",
            "category": "feature",
            "datetime": "2024-03-01T12:00:00Z",
            "tags": [{"id": "new-1", "name": "perf", "color": "#fff"}]
        }"##;
        let d: ReleaseDraft = serde_json::from_str(json).unwrap();
        assert!(matches!(d.id, Some(EntityId::Pending { .. })));
        assert_eq!(d.description, "");
        assert!(d.media.is_none());
        let tags = d.tags.unwrap();
        assert!(matches!(tags[0].id, Some(EntityId::Pending { .. })));
    }

    #[test]
    fn test_to_draft_marks_everything_persisted() {
        let release = Release {
            id: Uuid::new_v4(),
            title: "v2".into(),
            description: "d".into(),
            category: Category::Enhancement,
            datetime: Utc::now(),
            tags: vec![Tag {
                id: Uuid::new_v4(),
                name: "perf".into(),
                color: "#fff".into(),
            }],
            media: vec![Media {
                media_type: MediaType::Image,
                url: "https://cdn/x.png".into(),
            }],
        };
        let d = release.to_draft();
        assert_eq!(d.id, Some(EntityId::Persisted(release.id)));
        assert_eq!(
            d.tags.unwrap()[0].id,
            Some(EntityId::Persisted(release.tags[0].id))
        );
        assert_eq!(d.media.unwrap().len(), 1);
    }
}
