//! Item service: cache-aside reads, invalidation on writes
//!
//! Reads try Redis first and fall back to PostgreSQL, populating the
//! cache on the way out. Writes go to PostgreSQL and then drop the stale
//! cache entries: the detail key for that id plus every cached list page.
//! Cache failures are logged and degrade to uncached behavior; they never
//! fail a request. Store failures always propagate.

use crate::storage::{CacheStore, ItemStore};
use anyhow::Result;
use itemshelf_types::{Item, ItemCreate, ItemPage, ItemUpdate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Every cached list page shares this prefix, so one prefix drop
/// invalidates all paging and search variants at once
const LIST_KEY_PREFIX: &str = "items:";

pub struct ItemService {
    store: Arc<dyn ItemStore>,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
}

impl ItemService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        cache: Arc<dyn CacheStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Item>> {
        let key = detail_key(id);

        // Try cache first
        if let Some(item) = self.cache_read::<Item>(&key).await {
            return Ok(Some(item));
        }

        // Fall back to the store
        let item = self.store.get_item(id).await?;

        // Cache hits only; absent ids are never cached
        if let Some(item) = &item {
            self.cache_write(&key, item).await;
        }

        Ok(item)
    }

    pub async fn list(&self, skip: i64, limit: i64, search: Option<&str>) -> Result<ItemPage> {
        let key = list_key(skip, limit, search);

        if let Some(page) = self.cache_read::<ItemPage>(&key).await {
            return Ok(page);
        }

        let (items, total) = self.store.list_items(skip, limit, search).await?;
        let page = ItemPage { items, total };

        self.cache_write(&key, &page).await;

        Ok(page)
    }

    pub async fn create(&self, new_item: &ItemCreate) -> Result<Item> {
        let item = self.store.create_item(new_item).await?;
        info!("Created item {}", item.id);

        // A fresh id has no detail entry yet; only list pages went stale
        self.invalidate_lists().await;

        Ok(item)
    }

    pub async fn update(&self, id: i64, changes: &ItemUpdate) -> Result<Option<Item>> {
        let item = self.store.update_item(id, changes).await?;

        if item.is_some() {
            info!("Updated item {}", id);
            self.invalidate_item(id).await;
            self.invalidate_lists().await;
        }

        Ok(item)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self.store.delete_item(id).await?;

        if deleted {
            info!("Deleted item {}", id);
            self.invalidate_item(id).await;
            self.invalidate_lists().await;
        }

        Ok(deleted)
    }

    /// Cache read that degrades to a miss on any failure
    async fn cache_read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(value) => {
                    debug!("Cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read failed for {}: {:#}", key, e);
                None
            }
        }
    }

    /// Cache write that logs and moves on when the cache is unavailable
    async fn cache_write<T: serde::Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_vec(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.cache.set_with_ttl(key, data, self.cache_ttl).await {
            warn!("Cache write failed for {}: {:#}", key, e);
        }
    }

    async fn invalidate_item(&self, id: i64) {
        let key = detail_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!("Cache invalidation failed for {}: {:#}", key, e);
        }
    }

    async fn invalidate_lists(&self) {
        match self.cache.delete_prefix(LIST_KEY_PREFIX).await {
            Ok(n) if n > 0 => debug!("Invalidated {} cached list pages", n),
            Ok(_) => {}
            Err(e) => warn!("List cache invalidation failed: {:#}", e),
        }
    }
}

fn detail_key(id: i64) -> String {
    format!("item:{}", id)
}

fn list_key(skip: i64, limit: i64, search: Option<&str>) -> String {
    format!(
        "{}{}:{}:{}",
        LIST_KEY_PREFIX,
        skip,
        limit,
        search.unwrap_or("")
    )
}
