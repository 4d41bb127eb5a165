//! # relnote-core
//!
//! Core types, traits, and the release synchronization engine.
//!
//! The engine reconciles a [`ReleaseDraft`] (a release with nested tags and
//! media) against four relational tables through a [`ReleaseStore`] that
//! offers only independent row-level calls. Components, leaves first:
//!
//! - [`identity`]: create-vs-update decision carried as an [`EntityId`]
//! - [`tags`]: tag upsert, one row per call
//! - [`sync`]: tag link and media reconciliation for one release
//! - [`repository`]: fetch/save/delete facade
//!
//! Backends live in `relnote-db`; [`memory::MemoryReleaseStore`] is an
//! in-process store for tests and tooling.

pub mod error;
pub mod filter;
pub mod identity;
pub mod logging;
pub mod media;
pub mod memory;
pub mod models;
pub mod repository;
pub mod sync;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use filter::{CategoryFilter, DateFilter, ReleaseFilter, SortOrder};
pub use identity::{resolve, resolve_str, EntityId, Resolution, PLACEHOLDER_PREFIX};
pub use media::upload_media;
pub use memory::MemoryReleaseStore;
pub use models::*;
pub use repository::{ReleaseRepository, SaveOutcome};
pub use sync::{RelationSynchronizer, SyncStrategy};
pub use tags::TagUpsertService;
pub use traits::*;
