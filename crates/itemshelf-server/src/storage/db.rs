//! PostgreSQL persistence layer

use anyhow::{Context, Result};
use async_trait::async_trait;
use itemshelf_types::{Item, ItemCreate, ItemUpdate};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use super::ItemStore;

pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tracing::info!("PostgreSQL connection established, running migrations...");

        // Run migrations (inline for simplicity)
        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &PgPool) -> Result<()> {
        // Items table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Title index for the list search
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS items_title_idx ON items (title)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ItemStore for Database {
    async fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, title, description, is_active, created_at, updated_at
            FROM items WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_items(
        &self,
        skip: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<(Vec<Item>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM items
            WHERE $1::text IS NULL OR title ILIKE '%' || $1 || '%'
            "#,
        )
        .bind(search)
        .fetch_one(&*self.pool)
        .await?;

        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, title, description, is_active, created_at, updated_at
            FROM items
            WHERE $1::text IS NULL OR title ILIKE '%' || $1 || '%'
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(limit)
        .bind(skip)
        .fetch_all(&*self.pool)
        .await?;

        Ok((rows.into_iter().map(|r| r.into()).collect(), total))
    }

    async fn create_item(&self, new_item: &ItemCreate) -> Result<Item> {
        // Both timestamp columns default to the same transaction time
        let row: ItemRow = sqlx::query_as(
            r#"
            INSERT INTO items (title, description, is_active)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, is_active, created_at, updated_at
            "#,
        )
        .bind(&new_item.title)
        .bind(&new_item.description)
        .bind(new_item.is_active)
        .fetch_one(&*self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_item(&self, id: i64, changes: &ItemUpdate) -> Result<Option<Item>> {
        // $3 tells the statement whether description was supplied at all,
        // since NULL is a legal new value for it
        let description_set = changes.description.is_some();
        let description = changes.description.clone().flatten();

        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            UPDATE items SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, description, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(description_set)
        .bind(description)
        .bind(changes.is_active)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM items WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// Helper struct for sqlx query_as
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ItemRow> for Item {
    fn from(r: ItemRow) -> Self {
        Item {
            id: r.id,
            title: r.title,
            description: r.description,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
