//! Offline-aware accessors for notes, files, and events.
//!
//! Reads go to the backend when online and fall back to the local cache when
//! offline or when the backend fails. Writes go to the backend when online;
//! offline (or after a backend failure) they are queued for replay and the
//! cache gets an optimistic version of the result.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::models::{Event, FileRecord, FileUpload, NewMutation, Note, Resource};
use crate::network::NetworkMonitor;
use crate::optimistic::{self, is_temporary_id};
use crate::queue::MutationQueue;
use crate::remote::{self, Backend, FileTransfer, RemoteStore};
use crate::storage::KeyValueStore;
use crate::{Error, Result};

/// Entry point bundling the backend, local cache, mutation queue, and
/// connectivity observer shared by the accessors and the sync engine.
pub struct OfflineClient<B, S> {
    pub(crate) backend: Arc<B>,
    pub(crate) cache: Arc<CacheStore<S>>,
    pub(crate) queue: Arc<MutationQueue<S>>,
    pub(crate) network: Arc<dyn NetworkMonitor>,
}

impl<B, S> Clone for OfflineClient<B, S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            queue: Arc::clone(&self.queue),
            network: Arc::clone(&self.network),
        }
    }
}

impl<B, S> OfflineClient<B, S> {
    pub fn cache(&self) -> &CacheStore<S> {
        &self.cache
    }

    pub fn queue(&self) -> &MutationQueue<S> {
        &self.queue
    }

    pub fn is_offline(&self) -> bool {
        self.network.is_offline()
    }
}

impl<B: Backend, S: KeyValueStore> OfflineClient<B, S> {
    pub fn new(backend: Arc<B>, store: Arc<S>, network: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            backend,
            cache: Arc::new(CacheStore::new(Arc::clone(&store))),
            queue: Arc::new(MutationQueue::new(store)),
            network,
        }
    }

    /// Validate persisted state. Returns the number of pending mutations.
    pub async fn init(&self) -> usize {
        let discarded = self.cache.init().await;
        if discarded > 0 {
            tracing::warn!("Discarded {} stale cached collection(s)", discarded);
        }
        self.queue.init().await
    }

    pub fn notes(&self) -> ResourceAccessor<'_, Note, B, S> {
        ResourceAccessor::new(self)
    }

    pub fn files(&self) -> ResourceAccessor<'_, FileRecord, B, S> {
        ResourceAccessor::new(self)
    }

    pub fn events(&self) -> ResourceAccessor<'_, Event, B, S> {
        ResourceAccessor::new(self)
    }

    /// Forget every cached collection, queued mutation, and the last-sync stamp.
    ///
    /// The queue is cleared under its own lock so an enqueue or retry bump in
    /// flight cannot write cleared mutations back.
    pub async fn reset(&self) {
        self.queue.clear_queued_mutations().await;
        self.cache.clear_all_cached_data().await;
        tracing::info!("Local cache and mutation queue cleared");
    }
}

/// Offline-aware CRUD for one resource type.
pub struct ResourceAccessor<'a, R, B, S> {
    client: &'a OfflineClient<B, S>,
    resource: PhantomData<fn() -> R>,
}

impl<'a, R, B, S> ResourceAccessor<'a, R, B, S>
where
    R: Resource,
    B: RemoteStore<R>,
    S: KeyValueStore,
{
    const fn new(client: &'a OfflineClient<B, S>) -> Self {
        Self {
            client,
            resource: PhantomData,
        }
    }

    fn backend(&self) -> &B {
        &self.client.backend
    }

    fn cache(&self) -> &CacheStore<S> {
        &self.client.cache
    }

    /// Every record owned by `user_id`.
    pub async fn list(&self, user_id: &str) -> Result<Vec<R>> {
        if self.client.is_offline() {
            tracing::debug!("Offline: listing {} from cache", R::KIND.collection());
            return Ok(self.cache().for_user::<R>(user_id).await);
        }

        match RemoteStore::<R>::list(self.backend(), user_id).await {
            Ok(records) => {
                self.cache().set_cached_data(&records).await;
                Ok(records)
            }
            Err(error) => {
                let cached = self.cache().for_user::<R>(user_id).await;
                if cached.is_empty() {
                    return Err(error);
                }
                tracing::warn!(
                    "Listing {} failed, serving {} cached record(s): {}",
                    R::KIND.collection(),
                    cached.len(),
                    error
                );
                Ok(cached)
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<R>> {
        if self.client.is_offline() || is_temporary_id(id) {
            return Ok(self.cache().find::<R>(id).await);
        }

        match RemoteStore::<R>::get(self.backend(), id).await {
            Ok(Some(record)) => {
                self.cache().upsert(record.clone()).await;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(error) => match self.cache().find::<R>(id).await {
                Some(record) => {
                    tracing::warn!("Fetching {} {} failed, serving cached copy: {}", R::KIND, id, error);
                    Ok(Some(record))
                }
                None => Err(error),
            },
        }
    }

    /// Create a record. Offline, the returned record carries a temporary ID
    /// until the queued create replays.
    pub async fn create(&self, input: &R::Input) -> Result<R> {
        if self.client.is_offline() {
            let record: R = optimistic::created(input);
            let mutation = NewMutation::create::<R>(Some(record.id().to_string()), input)?;
            self.enqueue(mutation).await;
            self.cache().upsert(record.clone()).await;
            return Ok(record);
        }

        match RemoteStore::<R>::create(self.backend(), input).await {
            Ok(record) => {
                self.cache().upsert(record.clone()).await;
                Ok(record)
            }
            Err(error) => Err(self
                .queue_after_failure(NewMutation::create::<R>(None, input), error)
                .await),
        }
    }

    /// Apply a partial update. `None` when the record is unknown.
    ///
    /// Records that still carry a temporary ID are always updated locally;
    /// the queued update is pointed at the real ID once the create replays.
    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<Option<R>> {
        if self.client.is_offline() || is_temporary_id(id) {
            return self.update_locally(id, patch).await;
        }

        match remote::apply_update::<R, B>(self.backend(), id, patch).await {
            Ok(updated) => {
                if let Some(record) = &updated {
                    self.cache().upsert(record.clone()).await;
                }
                Ok(updated)
            }
            Err(error) => Err(self
                .queue_after_failure(NewMutation::update::<R>(id, patch), error)
                .await),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if is_temporary_id(id) {
            // The backend never saw this record; forget its pending writes.
            let discarded = self.client.queue.discard_for_record(R::KIND, id).await;
            tracing::debug!(
                "Deleted unsynced {} {} and {} queued mutation(s)",
                R::KIND,
                id,
                discarded
            );
            self.cache().remove::<R>(id).await;
            return Ok(());
        }

        if self.client.is_offline() {
            self.enqueue(NewMutation::delete::<R>(id)).await;
            self.cache().remove::<R>(id).await;
            return Ok(());
        }

        match RemoteStore::<R>::delete(self.backend(), id).await {
            Ok(()) => {
                self.cache().remove::<R>(id).await;
                Ok(())
            }
            Err(error) => Err(self
                .queue_after_failure(Ok(NewMutation::delete::<R>(id)), error)
                .await),
        }
    }

    pub async fn archive(&self, id: &str) -> Result<Option<R>> {
        self.set_archived(id, true).await
    }

    pub async fn restore(&self, id: &str) -> Result<Option<R>> {
        self.set_archived(id, false).await
    }

    async fn set_archived(&self, id: &str, archived: bool) -> Result<Option<R>> {
        let patch = R::archive_patch(archived).ok_or_else(|| {
            Error::InvalidInput(format!("{} records cannot be archived", R::KIND))
        })?;
        self.update(id, &patch).await
    }

    async fn update_locally(&self, id: &str, patch: &R::Patch) -> Result<Option<R>> {
        self.enqueue(NewMutation::update::<R>(id, patch)?).await;
        let Some(current) = self.cache().find::<R>(id).await else {
            tracing::debug!("{} {} is not cached; queued update only", R::KIND, id);
            return Ok(None);
        };
        let record = optimistic::updated(&current, patch);
        self.cache().upsert(record.clone()).await;
        Ok(Some(record))
    }

    async fn enqueue(&self, mutation: NewMutation) {
        let kind = mutation.kind;
        let id = self.client.queue.queue_mutation(mutation).await;
        tracing::debug!("Queued {} {} mutation {}", kind.as_str(), R::KIND, id);
    }

    /// Queue the write for replay and hand back the backend error.
    async fn queue_after_failure(&self, mutation: Result<NewMutation>, error: Error) -> Error {
        match mutation {
            Ok(mutation) => {
                tracing::warn!("{} write failed, queued for retry: {}", R::KIND, error);
                self.enqueue(mutation).await;
            }
            Err(encode_error) => {
                tracing::warn!(
                    "{} write failed and could not be queued: {}",
                    R::KIND,
                    encode_error
                );
            }
        }
        error
    }
}

impl<B, S> ResourceAccessor<'_, FileRecord, B, S>
where
    B: RemoteStore<FileRecord> + FileTransfer,
    S: KeyValueStore,
{
    /// Upload file bytes. Needs a connection; uploads are never queued.
    pub async fn upload(&self, upload: &FileUpload) -> Result<FileRecord> {
        if self.client.is_offline() {
            return Err(Error::Offline(format!(
                "cannot upload {} without a connection",
                upload.name
            )));
        }
        let record = self.backend().upload_file(upload).await?;
        self.cache().upsert(record.clone()).await;
        Ok(record)
    }

    /// Signed download URL for a stored file path.
    pub async fn download_url(&self, path: &str) -> Result<String> {
        if self.client.is_offline() {
            return Err(Error::Offline(
                "download URLs need a connection".to_string(),
            ));
        }
        self.backend().file_download_url(path).await
    }
}
