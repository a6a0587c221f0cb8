//! Bounded metadata cache
//!
//! Bridges "search result shown to the user" and "user picked it" without a
//! second catalog query. Entries are evicted in insertion order, in batches
//! of 10% of the capacity, when a new key would overflow the bound. The
//! cache is not durable: a miss means "ask the catalog again", never "this
//! item does not exist".

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::defaults::CACHE_EVICTION_PERCENT;
use crate::config::MetadataCacheConfig;
use crate::models::CatalogEntry;
use crate::utils::ContentIdentity;

/// Cached catalog payload
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub payload: CatalogEntry,
    pub inserted_at: DateTime<Utc>,
    /// Monotonic insertion sequence; breaks timestamp ties
    sequence: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ContentIdentity, CachedEntry>,
    next_sequence: u64,
}

/// Process-scoped cache of catalog entries keyed by primary identity
#[derive(Debug, Clone)]
pub struct MetadataCache {
    capacity: usize,
    state: Arc<RwLock<CacheState>>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    pub fn from_config(config: &MetadataCacheConfig) -> Self {
        Self::new(config.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries dropped per overflow
    pub fn eviction_batch(&self) -> usize {
        (self.capacity * CACHE_EVICTION_PERCENT / 100).max(1)
    }

    /// Insert or replace; replacing counts as a fresh insertion
    pub async fn put(&self, identity: ContentIdentity, payload: CatalogEntry) {
        let mut state = self.state.write().await;

        if state.entries.len() >= self.capacity && !state.entries.contains_key(&identity) {
            let evicted = Self::evict_oldest(&mut state, self.eviction_batch());
            debug!(
                "Metadata cache full ({} entries), evicted {} oldest",
                self.capacity, evicted
            );
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            identity,
            CachedEntry {
                payload,
                inserted_at: Utc::now(),
                sequence,
            },
        );
    }

    pub async fn get(&self, identity: &ContentIdentity) -> Option<CatalogEntry> {
        self.state
            .read()
            .await
            .entries
            .get(identity)
            .map(|entry| entry.payload.clone())
    }

    /// Entry with its insertion timestamp
    pub async fn get_entry(&self, identity: &ContentIdentity) -> Option<CachedEntry> {
        self.state.read().await.entries.get(identity).cloned()
    }

    pub async fn remove(&self, identity: &ContentIdentity) -> Option<CatalogEntry> {
        self.state
            .write()
            .await
            .entries
            .remove(identity)
            .map(|entry| entry.payload)
    }

    pub async fn contains(&self, identity: &ContentIdentity) -> bool {
        self.state.read().await.entries.contains_key(identity)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
    }

    fn evict_oldest(state: &mut CacheState, count: usize) -> usize {
        let mut by_age: Vec<(u64, ContentIdentity)> = state
            .entries
            .iter()
            .map(|(identity, entry)| (entry.sequence, *identity))
            .collect();
        by_age.sort_unstable_by_key(|(sequence, _)| *sequence);

        let victims: Vec<ContentIdentity> = by_age
            .into_iter()
            .take(count)
            .map(|(_, identity)| identity)
            .collect();
        for identity in &victims {
            state.entries.remove(identity);
        }
        victims.len()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::from_config(&MetadataCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentKind;
    use crate::utils::IdentityGenerator;

    fn entry(id: i64) -> (ContentIdentity, CatalogEntry) {
        let generator = IdentityGenerator::new("vodresolve");
        (
            generator.primary(ContentKind::Movie, id),
            CatalogEntry::new(ContentKind::Movie, id, format!("Movie {id}")),
        )
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = MetadataCache::new(10);
        let (identity, payload) = entry(603);

        assert!(cache.get(&identity).await.is_none());
        cache.put(identity, payload.clone()).await;
        assert_eq!(cache.get(&identity).await, Some(payload.clone()));
        assert!(cache.get_entry(&identity).await.is_some());

        assert_eq!(cache.remove(&identity).await, Some(payload));
        assert!(cache.is_empty().await);
        assert!(cache.remove(&identity).await.is_none());
    }

    #[tokio::test]
    async fn test_overflow_evicts_oldest_batch() {
        let cache = MetadataCache::default();
        assert_eq!(cache.capacity(), 500);
        assert_eq!(cache.eviction_batch(), 50);

        for id in 0..=500 {
            let (identity, payload) = entry(id);
            cache.put(identity, payload).await;
        }

        // 500 - 50 evicted + 1 inserted
        assert_eq!(cache.len().await, 451);
        for id in 0..50 {
            assert!(!cache.contains(&entry(id).0).await, "entry {id} should be evicted");
        }
        for id in 50..=500 {
            assert!(cache.contains(&entry(id).0).await, "entry {id} should be present");
        }
    }

    #[tokio::test]
    async fn test_replacing_existing_key_does_not_evict() {
        let cache = MetadataCache::new(3);
        for id in 0..3 {
            let (identity, payload) = entry(id);
            cache.put(identity, payload).await;
        }

        let (identity, mut payload) = entry(0);
        payload.title = "Renamed".to_string();
        cache.put(identity, payload).await;

        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get(&identity).await.map(|p| p.title), Some("Renamed".to_string()));
    }

    #[tokio::test]
    async fn test_small_capacity_evicts_at_least_one() {
        let cache = MetadataCache::new(2);
        assert_eq!(cache.eviction_batch(), 1);

        for id in 0..3 {
            let (identity, payload) = entry(id);
            cache.put(identity, payload).await;
        }

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains(&entry(0).0).await);
        assert!(cache.contains(&entry(2).0).await);
    }

    #[tokio::test]
    async fn test_reinserted_key_counts_as_newest() {
        let cache = MetadataCache::new(2);
        let (first, first_payload) = entry(1);
        let (second, second_payload) = entry(2);
        cache.put(first, first_payload.clone()).await;
        cache.put(second, second_payload).await;
        cache.put(first, first_payload).await;

        let (third, third_payload) = entry(3);
        cache.put(third, third_payload).await;

        assert!(cache.contains(&first).await);
        assert!(!cache.contains(&second).await);
    }
}
