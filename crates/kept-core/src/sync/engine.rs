//! Sync engine: drains the mutation queue in FIFO order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use super::{SyncEvent, SyncReport};
use crate::accessor::OfflineClient;
use crate::cache::CacheStore;
use crate::config::DEFAULT_MAX_RETRIES;
use crate::models::{
    CreatePayload, DeletePayload, Event, FileRecord, MutationKind, Note, QueuedMutation, Resource,
    ResourceKind, UpdatePayload,
};
use crate::network::NetworkMonitor;
use crate::optimistic::is_temporary_id;
use crate::queue::{remap_payload_id, MutationQueue};
use crate::remote::{self, Backend, RemoteStore};
use crate::storage::KeyValueStore;
use crate::Result;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Replays queued mutations, one pass at a time.
///
/// Concurrent [`SyncEngine::sync_now`] calls are coalesced: a caller that
/// arrives while a pass is running waits for it and receives its report.
pub struct SyncEngine<B, S> {
    backend: Arc<B>,
    cache: Arc<CacheStore<S>>,
    queue: Arc<MutationQueue<S>>,
    network: Arc<dyn NetworkMonitor>,
    max_retries: u32,
    // Held for the whole pass; stores the report of the last finished pass
    pass: Mutex<SyncReport>,
    completed_passes: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
}

impl<B: Backend, S: KeyValueStore> SyncEngine<B, S> {
    pub fn new(client: &OfflineClient<B, S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            backend: Arc::clone(&client.backend),
            cache: Arc::clone(&client.cache),
            queue: Arc::clone(&client.queue),
            network: Arc::clone(&client.network),
            max_retries: DEFAULT_MAX_RETRIES,
            pass: Mutex::new(SyncReport::default()),
            completed_passes: AtomicU64::new(0),
            events,
        }
    }

    /// Attempts a mutation gets before it is dropped (at least one).
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Receive invalidation, drop, and pass-completion events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.pass.try_lock().is_err()
    }

    /// Run one pass over the queue, or join the pass already in flight.
    pub async fn sync_now(&self) -> SyncReport {
        let observed = self.completed_passes.load(Ordering::Acquire);
        let mut last = self.pass.lock().await;
        if self.completed_passes.load(Ordering::Acquire) != observed {
            tracing::debug!("Joined a sync pass that was already running");
            return *last;
        }

        let report = self.run_pass().await;
        *last = report;
        self.completed_passes.fetch_add(1, Ordering::AcqRel);
        let _ = self.events.send(SyncEvent::PassCompleted(report));
        report
    }

    async fn run_pass(&self) -> SyncReport {
        let mut report = SyncReport::default();
        if self.network.is_offline() {
            tracing::debug!("Offline, skipping sync pass");
            return report;
        }

        let snapshot = self.queue.get_queued_mutations().await;
        if snapshot.is_empty() {
            return report;
        }
        tracing::info!("Replaying {} queued mutation(s)", snapshot.len());

        // Temporary IDs resolved during this pass
        let mut resolved: HashMap<(ResourceKind, String), String> = HashMap::new();
        // Temporary records whose create is still queued
        let mut unsynced: HashSet<(ResourceKind, String)> = snapshot
            .iter()
            .filter(|mutation| mutation.kind == MutationKind::Create)
            .filter_map(|mutation| {
                mutation
                    .record_id()
                    .map(|temp_id| (mutation.resource, temp_id.to_string()))
            })
            .collect();

        for mut mutation in snapshot {
            if let Some(real_id) = mutation
                .record_id()
                .and_then(|id| resolved.get(&(mutation.resource, id.to_string())))
                .cloned()
            {
                if let Some(temp_id) = mutation.record_id().map(ToString::to_string) {
                    remap_payload_id(&mut mutation.data, &temp_id, &real_id);
                }
            }

            if mutation.kind != MutationKind::Create {
                if let Some(temp_id) = mutation
                    .record_id()
                    .filter(|id| is_temporary_id(id))
                    .map(ToString::to_string)
                {
                    if unsynced.contains(&(mutation.resource, temp_id.clone())) {
                        tracing::debug!(
                            "Holding {} {} mutation {} until {} is created",
                            mutation.kind.as_str(),
                            mutation.resource,
                            mutation.id,
                            temp_id
                        );
                        continue;
                    }
                    // The create it depends on was dropped or is gone
                    tracing::warn!(
                        "Dropping {} {} mutation {}: {} was never created",
                        mutation.kind.as_str(),
                        mutation.resource,
                        mutation.id,
                        temp_id
                    );
                    self.queue.remove_queued_mutation(&mutation.id).await;
                    report.failed += 1;
                    report.dropped += 1;
                    let _ = self.events.send(SyncEvent::Dropped(mutation));
                    continue;
                }
            }

            match self.replay(&mutation).await {
                Ok(remapped) => {
                    self.queue.remove_queued_mutation(&mutation.id).await;
                    if let Some((temp_id, real_id)) = remapped {
                        unsynced.remove(&(mutation.resource, temp_id.clone()));
                        let rewritten = self
                            .queue
                            .remap_record_id(mutation.resource, &temp_id, &real_id)
                            .await;
                        tracing::debug!(
                            "{} {} is now {} ({} queued mutation(s) rewritten)",
                            mutation.resource,
                            temp_id,
                            real_id,
                            rewritten
                        );
                        resolved.insert((mutation.resource, temp_id), real_id);
                    }
                    report.success += 1;
                    let _ = self.events.send(SyncEvent::Invalidated(mutation.resource));
                }
                Err(error) => {
                    report.failed += 1;
                    if mutation.retries + 1 >= self.max_retries {
                        tracing::warn!(
                            "Dropping {} {} mutation {} after {} failed attempt(s): {}",
                            mutation.kind.as_str(),
                            mutation.resource,
                            mutation.id,
                            mutation.retries + 1,
                            error
                        );
                        self.queue.remove_queued_mutation(&mutation.id).await;
                        if mutation.kind == MutationKind::Create {
                            if let Some(temp_id) = mutation.record_id() {
                                unsynced.remove(&(mutation.resource, temp_id.to_string()));
                            }
                        }
                        report.dropped += 1;
                        let _ = self.events.send(SyncEvent::Dropped(mutation));
                    } else {
                        tracing::debug!(
                            "Replay of {} {} mutation {} failed, will retry: {}",
                            mutation.kind.as_str(),
                            mutation.resource,
                            mutation.id,
                            error
                        );
                        self.queue.update_mutation_retry(&mutation.id).await;
                    }
                }
            }
        }

        tracing::info!(
            "Sync pass finished: {} succeeded, {} failed, {} dropped",
            report.success,
            report.failed,
            report.dropped
        );
        report
    }

    /// Replay one mutation. Yields `(temp_id, real_id)` when a create
    /// replaced a temporary record.
    async fn replay(&self, mutation: &QueuedMutation) -> Result<Option<(String, String)>> {
        match mutation.resource {
            ResourceKind::Note => self.replay_as::<Note>(mutation).await,
            ResourceKind::File => self.replay_as::<FileRecord>(mutation).await,
            ResourceKind::Event => self.replay_as::<Event>(mutation).await,
        }
    }

    async fn replay_as<R>(&self, mutation: &QueuedMutation) -> Result<Option<(String, String)>>
    where
        R: Resource,
        B: RemoteStore<R>,
    {
        let backend = &*self.backend;
        match mutation.kind {
            MutationKind::Create => {
                let payload: CreatePayload<R::Input> =
                    serde_json::from_value(mutation.data.clone())?;
                let record = RemoteStore::<R>::create(backend, &payload.input).await?;
                let real_id = record.id().to_string();
                match payload.temp_id {
                    Some(temp_id) => {
                        self.cache.replace(&temp_id, record).await;
                        Ok(Some((temp_id, real_id)))
                    }
                    None => {
                        self.cache.upsert(record).await;
                        Ok(None)
                    }
                }
            }
            MutationKind::Update => {
                let payload: UpdatePayload<R::Patch> =
                    serde_json::from_value(mutation.data.clone())?;
                if let Some(record) =
                    remote::apply_update::<R, B>(backend, &payload.id, &payload.patch).await?
                {
                    self.cache.upsert(record).await;
                }
                Ok(None)
            }
            MutationKind::Delete => {
                let payload: DeletePayload = serde_json::from_value(mutation.data.clone())?;
                RemoteStore::<R>::delete(backend, &payload.id).await?;
                self.cache.remove::<R>(&payload.id).await;
                Ok(None)
            }
        }
    }
}

impl<B, S> SyncEngine<B, S>
where
    B: Backend + 'static,
    S: KeyValueStore + 'static,
{
    /// Run a pass every time `connectivity` goes from offline to online.
    ///
    /// The task ends when the connectivity sender is dropped.
    pub fn spawn_auto_sync(self: &Arc<Self>, mut connectivity: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut was_online = *connectivity.borrow_and_update();
        tokio::spawn(async move {
            while connectivity.changed().await.is_ok() {
                let online = *connectivity.borrow_and_update();
                if online && !was_online {
                    tracing::info!("Back online, syncing queued mutations");
                    engine.sync_now().await;
                }
                was_online = online;
            }
        })
    }
}
