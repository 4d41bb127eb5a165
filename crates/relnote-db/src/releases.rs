//! PostgreSQL implementation of [`ReleaseStore`].
//!
//! Every method is a single statement against the pool. No transaction spans
//! two calls; the synchronization engine in `relnote-core` is written for that.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use relnote_core::{
    Category, Error, MediaRow, MediaType, ReleaseFields, ReleaseRow, ReleaseStore, Result, Tag,
    TagLink,
};

/// PostgreSQL implementation of ReleaseStore.
#[derive(Clone)]
pub struct PgReleaseStore {
    pool: Pool<Postgres>,
}

impl PgReleaseStore {
    /// Create a new PgReleaseStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn release_row(row: &PgRow) -> ReleaseRow {
    ReleaseRow {
        id: row.get("id"),
        fields: ReleaseFields {
            title: row.get("title"),
            description: row.get("description"),
            category: Category::from(row.get::<String, _>("category")),
            datetime: row.get("datetime"),
        },
    }
}

fn media_row(row: &PgRow) -> Result<MediaRow> {
    let raw: String = row.get("type");
    let media_type = raw
        .parse::<MediaType>()
        .map_err(|_| Error::Storage(format!("unknown media type '{}' in media table", raw)))?;
    Ok(MediaRow {
        release_id: row.get("release_id"),
        media_type,
        url: row.get("url"),
    })
}

#[async_trait]
impl ReleaseStore for PgReleaseStore {
    async fn list_releases(&self) -> Result<Vec<ReleaseRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, category, datetime
            FROM releases
            ORDER BY datetime DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(release_row).collect())
    }

    async fn get_release(&self, id: Uuid) -> Result<Option<ReleaseRow>> {
        let row = sqlx::query(
            "SELECT id, title, description, category, datetime FROM releases WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(release_row))
    }

    async fn insert_release(&self, fields: &ReleaseFields) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO releases (title, description, category, datetime)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.category.as_str())
        .bind(fields.datetime)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "releases",
            op = "insert_release",
            release_id = %id,
            "Release row inserted"
        );
        Ok(id)
    }

    async fn update_release(&self, id: Uuid, fields: &ReleaseFields) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE releases
            SET title = $2, description = $3, category = $4, datetime = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.category.as_str())
        .bind(fields.datetime)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ReleaseNotFound(id));
        }
        Ok(())
    }

    async fn delete_release(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ReleaseNotFound(id));
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, color FROM tags ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                color: row.get("color"),
            })
            .collect())
    }

    async fn insert_tag(&self, name: &str, color: &str) -> Result<Uuid> {
        sqlx::query_scalar("INSERT INTO tags (name, color) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(color)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn update_tag(&self, id: Uuid, name: &str, color: &str) -> Result<()> {
        let result = sqlx::query("UPDATE tags SET name = $2, color = $3 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(color)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::TagNotFound(id));
        }
        Ok(())
    }

    async fn list_tag_links(&self) -> Result<Vec<TagLink>> {
        let rows = sqlx::query(
            r#"
            SELECT rt.release_id, t.id, t.name, t.color
            FROM release_tags rt
            JOIN tags t ON t.id = rt.tag_id
            ORDER BY rt.release_id, t.name, t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TagLink {
                release_id: row.get("release_id"),
                tag: Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                    color: row.get("color"),
                },
            })
            .collect())
    }

    async fn linked_tag_ids(&self, release_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar("SELECT tag_id FROM release_tags WHERE release_id = $1")
            .bind(release_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn insert_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO release_tags (release_id, tag_id) VALUES ($1, $2)")
            .bind(release_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_tag_link(&self, release_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM release_tags WHERE release_id = $1 AND tag_id = $2")
            .bind(release_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_tag_links(&self, release_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM release_tags WHERE release_id = $1")
            .bind(release_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_media(&self) -> Result<Vec<MediaRow>> {
        let rows = sqlx::query("SELECT release_id, type, url FROM media ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(media_row).collect()
    }

    async fn insert_media(&self, rows: &[MediaRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let release_ids: Vec<Uuid> = rows.iter().map(|r| r.release_id).collect();
        let types: Vec<String> = rows.iter().map(|r| r.media_type.to_string()).collect();
        let urls: Vec<String> = rows.iter().map(|r| r.url.clone()).collect();

        // One statement; ORDINALITY keeps the bigserial ids in input order.
        sqlx::query(
            r#"
            INSERT INTO media (release_id, type, url)
            SELECT m.release_id, m.type, m.url
            FROM UNNEST($1::uuid[], $2::text[], $3::text[])
                WITH ORDINALITY AS m(release_id, type, url, n)
            ORDER BY m.n
            "#,
        )
        .bind(&release_ids)
        .bind(&types)
        .bind(&urls)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "releases",
            op = "insert_media",
            media_count = rows.len(),
            "Media rows inserted"
        );
        Ok(())
    }

    async fn delete_media(&self, release_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM media WHERE release_id = $1")
            .bind(release_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
