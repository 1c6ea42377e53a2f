//! In-memory store and cache used by tests

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use itemshelf_types::{Item, ItemCreate, ItemUpdate};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{CacheStore, ItemStore};

/// In-memory double for the PostgreSQL store. Ids are monotonic and never
/// reused; listing orders by id and matches title substrings
/// case-insensitively, like the real queries.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

struct MemoryStoreInner {
    items: BTreeMap<i64, Item>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner {
                items: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get_item(&self, id: i64) -> Result<Option<Item>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.items.get(&id).cloned())
    }

    async fn list_items(
        &self,
        skip: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<(Vec<Item>, i64)> {
        let inner = self.inner.lock().unwrap();
        let needle = search.map(|s| s.to_lowercase());
        let matching: Vec<&Item> = inner
            .items
            .values()
            .filter(|item| match &needle {
                Some(needle) => item.title.to_lowercase().contains(needle),
                None => true,
            })
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn create_item(&self, new_item: &ItemCreate) -> Result<Item> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;

        let now = Utc::now();
        let item = Item {
            id,
            title: new_item.title.clone(),
            description: new_item.description.clone(),
            is_active: new_item.is_active,
            created_at: now,
            updated_at: now,
        };
        inner.items.insert(id, item.clone());

        Ok(item)
    }

    async fn update_item(&self, id: i64, changes: &ItemUpdate) -> Result<Option<Item>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(item) = inner.items.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply(item);
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.items.remove(&id).is_some())
    }
}

/// DashMap cache with per-entry TTL, checked on read
pub struct MemoryCache {
    data: DashMap<String, CacheEntry>,
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.data.get(key) {
            Some(entry) if Instant::now() > entry.expires_at => {
                drop(entry);
                self.data.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.data.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let keys: Vec<String> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if self.data.remove(&key).is_some() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_basic_operations() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache
            .set_with_ttl("key1", vec![1, 2, 3], ttl)
            .await
            .expect("set");
        assert_eq!(cache.get("key1").await.expect("get"), Some(vec![1, 2, 3]));

        assert_eq!(cache.get("nonexistent").await.expect("get"), None);

        cache.delete("key1").await.expect("delete");
        assert_eq!(cache.get("key1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let cache = MemoryCache::new();

        cache
            .set_with_ttl("key1", vec![1, 2, 3], Duration::from_millis(10))
            .await
            .expect("set");
        assert_eq!(cache.get("key1").await.expect("get"), Some(vec![1, 2, 3]));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("key1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn prefix_delete_spares_other_keys() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache
            .set_with_ttl("items:0:100:", vec![1], ttl)
            .await
            .expect("set");
        cache
            .set_with_ttl("items:10:10:milk", vec![2], ttl)
            .await
            .expect("set");
        cache.set_with_ttl("item:1", vec![3], ttl).await.expect("set");

        assert_eq!(cache.delete_prefix("items:").await.expect("prefix"), 2);
        assert_eq!(cache.get("item:1").await.expect("get"), Some(vec![3]));
        assert_eq!(cache.get("items:0:100:").await.expect("get"), None);
    }

    #[tokio::test]
    async fn store_never_reuses_ids() {
        let store = MemoryStore::new();
        let new_item = ItemCreate {
            title: "Milk".to_string(),
            description: None,
            is_active: true,
        };

        let first = store.create_item(&new_item).await.expect("create");
        assert!(store.delete_item(first.id).await.expect("delete"));

        let second = store.create_item(&new_item).await.expect("create");
        assert_eq!(second.id, first.id + 1);
    }
}
