//! Per-key async mutual exclusion
//!
//! Callers working on the same key are serialized; callers on different keys
//! run in parallel. Lock slots are dropped once nobody holds or waits on them.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    slots: DashMap<K, Arc<Mutex<()>>>,
}

/// Held for the duration of a critical section
pub struct KeyedGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    // Field order matters: the mutex is released before the slot is reclaimed
    _guard: OwnedMutexGuard<()>,
    _release: SlotRelease<'a, K>,
}

/// Drops the slot of `key` once no guard or waiter references it
struct SlotRelease<'a, K>
where
    K: Eq + Hash + Clone,
{
    key: K,
    owner: &'a KeyedLock<K>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        // Also runs if this future is dropped while still waiting
        let release = SlotRelease { key, owner: self };
        let guard = slot.lock_owned().await;

        KeyedGuard {
            _guard: guard,
            _release: release,
        }
    }

    /// Number of keys currently locked or awaited
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for SlotRelease<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // The map holds one reference; any other belongs to a holder or waiter
        self.owner
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let lock = Arc::new(KeyedLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = lock.lock("movie/603").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(lock.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let lock = KeyedLock::new();
        let _first = lock.lock("movie/1").await;

        let second = tokio::time::timeout(Duration::from_millis(50), lock.lock("movie/2")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_releases_slot() {
        let lock = KeyedLock::new();
        let holder = lock.lock("movie/603").await;

        let mut waiter = Box::pin(lock.lock("movie/603"));
        assert!(futures::poll!(&mut waiter).is_pending());

        drop(holder);
        assert_eq!(lock.active_keys(), 1);

        drop(waiter);
        assert_eq!(lock.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_waiter_releases_slot() {
        let lock = KeyedLock::new();
        let holder = lock.lock("movie/603").await;

        let waited = tokio::time::timeout(Duration::from_millis(5), lock.lock("movie/603")).await;
        assert!(waited.is_err());

        drop(holder);
        assert_eq!(lock.active_keys(), 0);
    }
}
