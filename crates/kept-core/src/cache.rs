//! Local cache of resource collections and sync metadata.
//!
//! Each resource kind is mirrored as one versioned blob holding the whole
//! collection. The cache is a full mirror of what the backend last returned
//! (plus optimistic local changes); there is no eviction. Storage failures are
//! logged and reported to callers as "nothing cached".

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{Resource, ResourceKind};
use crate::storage::KeyValueStore;
use crate::util::now_ms;

/// Storage key of the last-sync timestamp
pub const LAST_SYNC_KEY: &str = "last_sync";

/// Version tag written into every collection blob
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Storage key of a resource collection
pub fn cache_key(kind: ResourceKind) -> String {
    format!("cache:{}", kind.collection())
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope<T> {
    version: u32,
    saved_at: i64,
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

/// Whole-collection cache per resource kind
pub struct CacheStore<S> {
    store: Arc<S>,
    // Serializes read-modify-write sequences on collection blobs
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> CacheStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate persisted collections, discarding blobs written in another
    /// format version or that no longer decode. Returns how many were discarded.
    pub async fn init(&self) -> usize {
        let mut discarded = 0;
        for kind in ResourceKind::ALL {
            let key = cache_key(kind);
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!("Failed to read cached {} during init: {}", kind, error);
                    continue;
                }
            };

            let stale = match serde_json::from_str::<EnvelopeHeader>(&raw) {
                Ok(header) => header.version != CACHE_FORMAT_VERSION,
                Err(_) => true,
            };
            if stale {
                tracing::warn!("Discarding cached {} written in an unsupported format", kind);
                if let Err(error) = self.store.remove(&key).await {
                    tracing::warn!("Failed to discard cached {}: {}", kind, error);
                }
                discarded += 1;
            }
        }
        discarded
    }

    /// The cached collection, or `None` if it was never cached or cannot be read
    pub async fn get_cached_data<R: Resource>(&self) -> Option<Vec<R>> {
        let key = cache_key(R::KIND);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read cached {}: {}", R::KIND, error);
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope<R>>(&raw) {
            Ok(envelope) if envelope.version == CACHE_FORMAT_VERSION => Some(envelope.items),
            Ok(envelope) => {
                tracing::warn!(
                    "Ignoring cached {} with format version {}",
                    R::KIND,
                    envelope.version
                );
                None
            }
            Err(error) => {
                tracing::warn!("Failed to decode cached {}: {}", R::KIND, error);
                None
            }
        }
    }

    /// Replace the cached collection wholesale and stamp the last-sync time
    pub async fn set_cached_data<R: Resource>(&self, items: &[R]) {
        let _guard = self.write_lock.lock().await;
        self.write_collection(dedupe_by_id(items)).await;
    }

    /// Remove every collection and the sync metadata.
    ///
    /// The mutation queue belongs to [`MutationQueue`](crate::queue::MutationQueue);
    /// `OfflineClient::reset` clears both.
    pub async fn clear_all_cached_data(&self) {
        let _guard = self.write_lock.lock().await;
        let keys = ResourceKind::ALL
            .into_iter()
            .map(cache_key)
            .chain([LAST_SYNC_KEY.to_string()]);
        for key in keys {
            if let Err(error) = self.store.remove(&key).await {
                tracing::warn!("Failed to clear {}: {}", key, error);
            }
        }
        tracing::info!("Cleared all cached data");
    }

    /// When the cache was last written (Unix ms)
    pub async fn last_sync_at(&self) -> Option<i64> {
        match self.store.get(LAST_SYNC_KEY).await {
            Ok(raw) => raw?.trim().parse().ok(),
            Err(error) => {
                tracing::warn!("Failed to read last sync time: {}", error);
                None
            }
        }
    }

    /// A single cached record
    pub async fn find<R: Resource>(&self, id: &str) -> Option<R> {
        self.get_cached_data::<R>()
            .await?
            .into_iter()
            .find(|record| record.id() == id)
    }

    /// Cached records owned by `user_id`, in cache order
    pub async fn for_user<R: Resource>(&self, user_id: &str) -> Vec<R> {
        self.get_cached_data::<R>()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|record| record.user_id() == user_id)
            .collect()
    }

    /// Insert or replace one record; new records go to the front
    pub async fn upsert<R: Resource>(&self, record: R) {
        let _guard = self.write_lock.lock().await;
        let mut items = self.get_cached_data::<R>().await.unwrap_or_default();
        if let Some(existing) = items.iter_mut().find(|item| item.id() == record.id()) {
            *existing = record;
        } else {
            items.insert(0, record);
        }
        self.write_collection(items).await;
    }

    /// Drop one record; no-op if it is not cached
    pub async fn remove<R: Resource>(&self, id: &str) {
        let _guard = self.write_lock.lock().await;
        let Some(mut items) = self.get_cached_data::<R>().await else {
            return;
        };
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() != before {
            self.write_collection(items).await;
        }
    }

    /// Swap the record cached under `old_id` for `record`, keeping its position.
    ///
    /// Used when a temporary record is confirmed by the backend under a new ID.
    pub async fn replace<R: Resource>(&self, old_id: &str, record: R) {
        let _guard = self.write_lock.lock().await;
        let mut items = self.get_cached_data::<R>().await.unwrap_or_default();
        items.retain(|item| item.id() != record.id() || item.id() == old_id);
        if let Some(existing) = items.iter_mut().find(|item| item.id() == old_id) {
            *existing = record;
        } else {
            items.insert(0, record);
        }
        self.write_collection(items).await;
    }

    async fn write_collection<R: Resource>(&self, items: Vec<R>) {
        let saved_at = now_ms();
        let envelope = CacheEnvelope {
            version: CACHE_FORMAT_VERSION,
            saved_at,
            items,
        };
        let serialized = match serde_json::to_string(&envelope) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!("Failed to serialize cached {}: {}", R::KIND, error);
                return;
            }
        };

        if let Err(error) = self.store.set(&cache_key(R::KIND), &serialized).await {
            tracing::warn!("Failed to persist cached {}: {}", R::KIND, error);
            return;
        }
        self.stamp_last_sync(saved_at).await;
    }

    async fn stamp_last_sync(&self, now: i64) {
        let stamp = self.last_sync_at().await.map_or(now, |last| last.max(now));
        if let Err(error) = self.store.set(LAST_SYNC_KEY, &stamp.to_string()).await {
            tracing::warn!("Failed to persist last sync time: {}", error);
        }
    }
}

/// Keep one record per ID; a later duplicate wins but keeps the first position
fn dedupe_by_id<R: Resource>(items: &[R]) -> Vec<R> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<R> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(&index) = positions.get(item.id()) {
            unique[index] = item.clone();
        } else {
            positions.insert(item.id(), unique.len());
            unique.push(item.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNote, Note};
    use crate::queue::QUEUE_KEY;
    use crate::storage::MemoryStore;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn note(id: &str, user_id: &str, title: &str) -> Note {
        Note::build(id.to_string(), &NewNote::new(user_id, title), 1)
    }

    fn cache() -> (Arc<MemoryStore>, CacheStore<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), CacheStore::new(store))
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> crate::Result<Option<String>> {
            Err(Error::Database("disk unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> crate::Result<()> {
            Err(Error::Database("disk unavailable".to_string()))
        }

        async fn remove(&self, _key: &str) -> crate::Result<()> {
            Err(Error::Database("disk unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_never_cached_is_none() {
        let (_, cache) = cache();
        assert_eq!(cache.get_cached_data::<Note>().await, None);
        assert_eq!(cache.last_sync_at().await, None);
    }

    #[tokio::test]
    async fn test_set_dedupes_last_write_wins() {
        let (_, cache) = cache();
        cache
            .set_cached_data(&[
                note("a", "u1", "old"),
                note("b", "u1", "b"),
                note("a", "u1", "new"),
            ])
            .await;

        let cached = cache.get_cached_data::<Note>().await.unwrap();
        let titles: Vec<_> = cached.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "b"]);
        assert!(cache.last_sync_at().await.is_some());
    }

    #[tokio::test]
    async fn test_single_record_patch_stamps_last_sync() {
        let (store, cache) = cache();
        store.set(LAST_SYNC_KEY, "5").await.unwrap();

        cache.upsert(note("a", "u1", "a")).await;

        let stamped = cache.last_sync_at().await.unwrap();
        assert!(stamped > 5);
    }

    #[tokio::test]
    async fn test_last_sync_never_moves_backwards() {
        let (store, cache) = cache();
        let future = now_ms() + 60_000;
        store.set(LAST_SYNC_KEY, &future.to_string()).await.unwrap();

        cache.set_cached_data(&[note("a", "u1", "a")]).await;
        assert_eq!(cache.last_sync_at().await, Some(future));
    }

    #[tokio::test]
    async fn test_upsert_remove_and_replace() {
        let (_, cache) = cache();
        cache.upsert(note("a", "u1", "a")).await;
        cache.upsert(note("temp_1_x", "u1", "draft")).await;
        cache.upsert(note("a", "u1", "a2")).await;

        cache.replace("temp_1_x", note("real-1", "u1", "draft")).await;
        let ids: Vec<_> = cache
            .get_cached_data::<Note>()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["real-1".to_string(), "a".to_string()]);
        assert_eq!(cache.find::<Note>("a").await.unwrap().title, "a2");

        cache.remove::<Note>("a").await;
        cache.remove::<Note>("missing").await;
        assert_eq!(cache.find::<Note>("a").await, None);
    }

    #[tokio::test]
    async fn test_replace_does_not_duplicate_existing_authoritative_record() {
        let (_, cache) = cache();
        cache
            .set_cached_data(&[note("real-1", "u1", "fetched"), note("temp_1_x", "u1", "draft")])
            .await;

        cache.replace("temp_1_x", note("real-1", "u1", "confirmed")).await;

        let cached = cache.get_cached_data::<Note>().await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].title, "confirmed");
    }

    #[tokio::test]
    async fn test_for_user_filters() {
        let (_, cache) = cache();
        cache
            .set_cached_data(&[note("a", "A", "1"), note("b", "B", "2"), note("c", "A", "3")])
            .await;
        let mine = cache.for_user::<Note>("A").await;
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|n| n.user_id == "A"));
    }

    #[tokio::test]
    async fn test_clear_all_removes_collections_and_metadata() {
        let (store, cache) = cache();
        cache.set_cached_data(&[note("a", "u1", "a")]).await;
        store.set(QUEUE_KEY, "{}").await.unwrap();

        cache.clear_all_cached_data().await;

        assert_eq!(store.keys().await, vec![QUEUE_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_init_discards_stale_versions() {
        let (store, cache) = cache();
        cache.set_cached_data(&[note("a", "u1", "a")]).await;
        store
            .set(
                &cache_key(ResourceKind::Event),
                r#"{"version":99,"saved_at":0,"items":[]}"#,
            )
            .await
            .unwrap();
        store
            .set(&cache_key(ResourceKind::File), "not json")
            .await
            .unwrap();

        assert_eq!(cache.init().await, 2);
        assert!(cache.get_cached_data::<Note>().await.is_some());
        assert_eq!(store.get(&cache_key(ResourceKind::Event)).await.unwrap(), None);
        assert_eq!(store.get(&cache_key(ResourceKind::File)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_storage_errors_read_as_not_cached() {
        let cache = CacheStore::new(Arc::new(BrokenStore));
        cache.set_cached_data(&[note("a", "u1", "a")]).await;
        assert_eq!(cache.get_cached_data::<Note>().await, None);
        assert!(cache.for_user::<Note>("u1").await.is_empty());
        cache.clear_all_cached_data().await;
    }
}
