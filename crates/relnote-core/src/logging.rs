//! Structured logging field name constants for relnote.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed and was returned to the caller |
//! | WARN  | Partial write left behind, caller must retry |
//! | INFO  | Operation completions (save, delete, fetch) |
//! | DEBUG | Decision points (identity resolution, sync counts) |
//! | TRACE | Per-row work (each tag upsert, each link) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "db", "blob", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "repository", "relation_sync", "tag_upsert", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "save", "delete", "fetch_all", "sync_tags"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Release UUID being operated on.
pub const RELEASE_ID: &str = "release_id";

/// Tag UUID being operated on.
pub const TAG_ID: &str = "tag_id";

/// Client-minted placeholder id of a pending draft.
pub const DRAFT_ID: &str = "draft_id";

/// Blob storage key.
pub const BLOB_KEY: &str = "blob_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of releases in a snapshot.
pub const RELEASE_COUNT: &str = "release_count";

/// Number of tags in a desired set.
pub const TAG_COUNT: &str = "tag_count";

/// Number of media rows in a desired set.
pub const MEDIA_COUNT: &str = "media_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether a save created a new release.
pub const CREATED: &str = "created";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
