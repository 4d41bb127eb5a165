//! # relnote-db
//!
//! PostgreSQL and filesystem backends for relnote.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgReleaseStore`], the row-level store behind the sync engine
//! - [`FilesystemBlobStorage`] for media uploads
//!
//! ## Example
//!
//! ```rust,ignore
//! use relnote_db::{Database, ReleaseDraft, Category, SyncStrategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/relnote").await?;
//!     db.migrate().await?;
//!
//!     let repo = db.repository(SyncStrategy::Replace);
//!     let mut draft = ReleaseDraft::new("v1.0", Category::Feature, chrono::Utc::now());
//!     let outcome = repo.save(&mut draft).await?;
//!
//!     println!("Saved release: {}", outcome.release_id);
//!     Ok(())
//! }
//! ```
pub mod file_storage;
pub mod pool;
pub mod releases;

// Note: Always compiled so integration tests (in tests/) can use it
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use relnote_core::*;

pub use file_storage::FilesystemBlobStorage;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use releases::PgReleaseStore;

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Row-level store for releases, tags, links and media.
    pub releases: PgReleaseStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            releases: PgReleaseStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect to database with default settings.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Release repository over this database.
    pub fn repository(&self, strategy: SyncStrategy) -> ReleaseRepository {
        let store: Arc<dyn ReleaseStore> = Arc::new(self.releases.clone());
        ReleaseRepository::new(store).with_sync_strategy(strategy)
    }
}
