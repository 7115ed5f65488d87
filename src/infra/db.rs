use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::app::images::{ImageStore, InsertError};
use crate::config::AppConfig;
use crate::domain::image::ImageRecord;

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Postgres-backed image record store. The `images_short_id_idx` unique index
/// is what turns a short-id race into an explicit insert failure.
#[derive(Clone)]
pub struct PgImageStore {
    db: Db,
}

impl PgImageStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> ImageRecord {
    ImageRecord {
        id: row.get("id"),
        short_id: row.get("short_id"),
        file_name: row.get("file_name"),
        file_key: row.get("file_key"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn insert(&self, record: &ImageRecord) -> Result<(), InsertError> {
        let result = sqlx::query(
            "INSERT INTO images (id, short_id, file_name, file_key, image_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(&record.short_id)
        .bind(&record.file_name)
        .bind(&record.file_key)
        .bind(&record.image_url)
        .bind(record.created_at)
        .execute(self.db.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(InsertError::DuplicateShortId)
            }
            Err(err) => Err(InsertError::Store(err.into())),
        }
    }

    async fn find_by_short_id(&self, short_id: &str) -> Result<Option<ImageRecord>> {
        let row = sqlx::query(
            "SELECT id, short_id, file_name, file_key, image_url, created_at \
             FROM images WHERE short_id = $1",
        )
        .bind(short_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn list_newest_first(&self) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            "SELECT id, short_id, file_name, file_key, image_url, created_at \
             FROM images ORDER BY created_at DESC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
