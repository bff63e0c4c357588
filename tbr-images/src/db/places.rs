//! Permanent store for resolved place images
//!
//! One row per place slug. Featured and gallery columns are written
//! independently; writing one never clears the other. Gallery URLs are
//! stored as a JSON array.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tbr_common::{Error, Result};

/// Stored image fields of one place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceImages {
    pub slug: String,
    pub name: String,
    pub featured_image: Option<String>,
    pub gallery_images: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Permanent store interface
///
/// Entries never expire. The pipeline decides whether a write is allowed.
/// `save_*` overwrite unconditionally; `save_*_if_unchanged` only write
/// while the column still holds the value the caller read, and return
/// `false` when another writer got there first.
#[async_trait]
pub trait PlaceStore: Send + Sync {
    async fn load(&self, slug: &str) -> Result<Option<PlaceImages>>;

    async fn save_featured(&self, slug: &str, name: &str, url: &str) -> Result<()>;

    async fn save_gallery(&self, slug: &str, name: &str, urls: &[String]) -> Result<()>;

    async fn save_featured_if_unchanged(
        &self,
        slug: &str,
        name: &str,
        url: &str,
        expected: Option<&str>,
    ) -> Result<bool>;

    async fn save_gallery_if_unchanged(
        &self,
        slug: &str,
        name: &str,
        urls: &[String],
        expected: &[String],
    ) -> Result<bool>;
}

fn encode_gallery(urls: &[String]) -> Result<String> {
    serde_json::to_string(urls)
        .map_err(|e| Error::Internal(format!("Failed to encode gallery: {}", e)))
}

pub struct SqlitePlaceStore {
    pool: SqlitePool,
}

impl SqlitePlaceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PlaceStore for SqlitePlaceStore {
    async fn load(&self, slug: &str) -> Result<Option<PlaceImages>> {
        let row = sqlx::query(
            "SELECT slug, name, featured_image, gallery_images, updated_at FROM places WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let gallery_json: String = row.get("gallery_images");
        let gallery_images: Vec<String> = serde_json::from_str(&gallery_json).map_err(|e| {
            Error::Internal(format!("Corrupt gallery_images for place '{}': {}", slug, e))
        })?;

        let updated_at: String = row.get("updated_at");
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .ok()
            .map(|t| t.with_timezone(&Utc));

        Ok(Some(PlaceImages {
            slug: row.get("slug"),
            name: row.get("name"),
            featured_image: row
                .get::<Option<String>, _>("featured_image")
                .filter(|url| !url.trim().is_empty()),
            gallery_images,
            updated_at,
        }))
    }

    async fn save_featured(&self, slug: &str, name: &str, url: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO places (slug, name, featured_image, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                featured_image = excluded.featured_image,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_gallery(&self, slug: &str, name: &str, urls: &[String]) -> Result<()> {
        let gallery_json = encode_gallery(urls)?;

        sqlx::query(
            r#"
            INSERT INTO places (slug, name, gallery_images, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                gallery_images = excluded.gallery_images,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(gallery_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_featured_if_unchanged(
        &self,
        slug: &str,
        name: &str,
        url: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        // Blank and NULL both read back as "no featured image"
        let result = sqlx::query(
            r#"
            INSERT INTO places (slug, name, featured_image, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                featured_image = excluded.featured_image,
                updated_at = excluded.updated_at
            WHERE COALESCE(TRIM(places.featured_image), '') = COALESCE(?, '')
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(url)
        .bind(Utc::now().to_rfc3339())
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_gallery_if_unchanged(
        &self,
        slug: &str,
        name: &str,
        urls: &[String],
        expected: &[String],
    ) -> Result<bool> {
        let gallery_json = encode_gallery(urls)?;
        let expected_json = encode_gallery(expected)?;

        let result = sqlx::query(
            r#"
            INSERT INTO places (slug, name, gallery_images, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                gallery_images = excluded.gallery_images,
                updated_at = excluded.updated_at
            WHERE json(places.gallery_images) = json(?)
            "#,
        )
        .bind(slug)
        .bind(name)
        .bind(gallery_json)
        .bind(Utc::now().to_rfc3339())
        .bind(expected_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
