//! Storage layer
//!
//! PostgreSQL holds the items; Redis fronts it as a byte-oriented cache.
//! Both sit behind traits so the service and HTTP layers test against
//! in-memory doubles.

pub mod cache;
pub mod db;
#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use itemshelf_types::{Item, ItemCreate, ItemUpdate};
use std::time::Duration;

pub use cache::{NullCache, RedisCache};
pub use db::Database;
#[cfg(test)]
pub use memory::{MemoryCache, MemoryStore};

/// Durable item persistence
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_item(&self, id: i64) -> Result<Option<Item>>;

    /// One page of items ordered by id, optionally filtered by a
    /// case-insensitive title substring, plus the total match count
    async fn list_items(
        &self,
        skip: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<(Vec<Item>, i64)>;

    async fn create_item(&self, new_item: &ItemCreate) -> Result<Item>;

    /// Apply the supplied fields and refresh `updated_at`. `None` when
    /// the id does not exist.
    async fn update_item(&self, id: i64, changes: &ItemUpdate) -> Result<Option<Item>>;

    /// `false` when the id does not exist
    async fn delete_item(&self, id: i64) -> Result<bool>;
}

/// Cache of serialized values with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`, returning how many went
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}
