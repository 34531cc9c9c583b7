//! Persisted FIFO queue of writes waiting to be replayed against the backend.
//!
//! The queue lives in a single versioned blob. Every operation reloads it from
//! storage under an async lock, so the accessors and the sync engine can share
//! one instance. Storage failures are logged and leave the stored blob
//! untouched. A blob that no longer decodes, or carries another format
//! version, is discarded and replaced by the next write.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{MutationKind, NewMutation, QueuedMutation, ResourceKind};
use crate::storage::KeyValueStore;
use crate::util::now_ms;

/// Storage key of the queue blob
pub const QUEUE_KEY: &str = "mutation_queue";

/// Version tag written into the queue blob
pub const QUEUE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct QueueEnvelope {
    version: u32,
    mutations: Vec<QueuedMutation>,
}

/// Ordered log of pending mutations
pub struct MutationQueue<S> {
    store: Arc<S>,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> MutationQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Load the persisted queue, discarding a blob in an unsupported format.
    /// Returns the number of pending mutations.
    pub async fn init(&self) -> usize {
        let _guard = self.lock.lock().await;
        let Some(mutations) = self.load().await else {
            return 0;
        };
        if mutations.is_empty() {
            // Rewrites an undecodable blob as an empty queue
            if let Ok(Some(_)) = self.store.get(QUEUE_KEY).await {
                self.save(&mutations).await;
            }
        } else {
            tracing::info!("{} queued mutation(s) pending sync", mutations.len());
        }
        mutations.len()
    }

    /// Append a mutation and return its queue-local ID
    pub async fn queue_mutation(&self, mutation: NewMutation) -> String {
        let _guard = self.lock.lock().await;
        let queued = QueuedMutation {
            id: Uuid::now_v7().to_string(),
            kind: mutation.kind,
            resource: mutation.resource,
            data: mutation.data,
            timestamp: now_ms(),
            retries: 0,
        };
        let id = queued.id.clone();

        let Some(mut mutations) = self.load().await else {
            tracing::error!(
                "Mutation queue unavailable; {} {} could not be queued",
                queued.kind.as_str(),
                queued.resource
            );
            return id;
        };
        tracing::debug!(
            "Queued {} {} ({})",
            queued.kind.as_str(),
            queued.resource,
            queued.id
        );
        mutations.push(queued);
        self.save(&mutations).await;
        id
    }

    /// Every pending mutation, oldest first
    pub async fn get_queued_mutations(&self) -> Vec<QueuedMutation> {
        let _guard = self.lock.lock().await;
        self.load().await.unwrap_or_default()
    }

    pub async fn pending_count(&self) -> usize {
        self.get_queued_mutations().await.len()
    }

    /// Remove one mutation; no-op if it is already gone
    pub async fn remove_queued_mutation(&self, id: &str) {
        self.modify(|mutations| {
            let before = mutations.len();
            mutations.retain(|mutation| mutation.id != id);
            before != mutations.len()
        })
        .await;
    }

    /// Increment the retry counter of one mutation in place
    pub async fn update_mutation_retry(&self, id: &str) {
        self.modify(|mutations| {
            let Some(mutation) = mutations.iter_mut().find(|mutation| mutation.id == id) else {
                return false;
            };
            mutation.retries += 1;
            true
        })
        .await;
    }

    pub async fn clear_queued_mutations(&self) {
        let _guard = self.lock.lock().await;
        if let Err(error) = self.store.remove(QUEUE_KEY).await {
            tracing::warn!("Failed to clear mutation queue: {}", error);
        }
    }

    /// Point queued updates and deletes of `kind` at `new_id` instead of `old_id`.
    ///
    /// Returns how many mutations were rewritten.
    pub async fn remap_record_id(&self, kind: ResourceKind, old_id: &str, new_id: &str) -> usize {
        let mut rewritten = 0;
        self.modify(|mutations| {
            for mutation in mutations.iter_mut() {
                if mutation.resource == kind && remap_payload_id(&mut mutation.data, old_id, new_id)
                {
                    rewritten += 1;
                }
            }
            rewritten > 0
        })
        .await;
        rewritten
    }

    /// Drop every queued create/update/delete of a record that never reached
    /// the backend. Returns how many mutations were removed.
    pub async fn discard_for_record(&self, kind: ResourceKind, temp_id: &str) -> usize {
        let mut removed = 0;
        self.modify(|mutations| {
            let before = mutations.len();
            mutations.retain(|mutation| {
                mutation.resource != kind || !targets_record(mutation, temp_id)
            });
            removed = before - mutations.len();
            removed > 0
        })
        .await;
        removed
    }

    /// Run `change` over the loaded queue and persist it when it reports a change
    async fn modify<F>(&self, change: F)
    where
        F: FnOnce(&mut Vec<QueuedMutation>) -> bool + Send,
    {
        let _guard = self.lock.lock().await;
        let Some(mut mutations) = self.load().await else {
            return;
        };
        if change(&mut mutations) {
            self.save(&mutations).await;
        }
    }

    /// `None` when storage cannot be read; an undecodable blob loads as empty
    async fn load(&self) -> Option<Vec<QueuedMutation>> {
        let raw = match self.store.get(QUEUE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(error) => {
                tracing::warn!("Failed to read mutation queue: {}", error);
                return None;
            }
        };

        match serde_json::from_str::<QueueEnvelope>(&raw) {
            Ok(envelope) if envelope.version == QUEUE_FORMAT_VERSION => Some(envelope.mutations),
            Ok(envelope) => {
                tracing::warn!(
                    "Discarding mutation queue with format version {}",
                    envelope.version
                );
                Some(Vec::new())
            }
            Err(error) => {
                tracing::warn!("Discarding undecodable mutation queue: {}", error);
                Some(Vec::new())
            }
        }
    }

    async fn save(&self, mutations: &[QueuedMutation]) {
        let envelope = QueueEnvelope {
            version: QUEUE_FORMAT_VERSION,
            mutations: mutations.to_vec(),
        };
        let serialized = match serde_json::to_string(&envelope) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!("Failed to serialize mutation queue: {}", error);
                return;
            }
        };
        if let Err(error) = self.store.set(QUEUE_KEY, &serialized).await {
            tracing::warn!("Failed to persist mutation queue: {}", error);
        }
    }
}

/// Rewrite `data.id` from `old_id` to `new_id`; true if it changed
pub(crate) fn remap_payload_id(data: &mut Value, old_id: &str, new_id: &str) -> bool {
    match data.get_mut("id") {
        Some(id) if id.as_str() == Some(old_id) => {
            *id = Value::String(new_id.to_string());
            true
        }
        _ => false,
    }
}

fn targets_record(mutation: &QueuedMutation, record_id: &str) -> bool {
    let key = match mutation.kind {
        MutationKind::Create => "temp_id",
        MutationKind::Update | MutationKind::Delete => "id",
    };
    mutation.data.get(key).and_then(Value::as_str) == Some(record_id)
}
