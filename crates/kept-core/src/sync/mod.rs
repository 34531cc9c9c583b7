//! Replays queued mutations against the backend.

mod engine;

use serde::{Deserialize, Serialize};

pub use engine::SyncEngine;

use crate::models::{QueuedMutation, ResourceKind};

/// Outcome counts of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Mutations replayed and removed from the queue
    pub success: usize,
    /// Mutations whose replay failed this pass
    pub failed: usize,
    /// Subset of `failed` dropped after exhausting their retries
    pub dropped: usize,
}

impl SyncReport {
    pub const fn is_empty(&self) -> bool {
        self.success == 0 && self.failed == 0
    }
}

/// Notifications broadcast by the sync engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Cached data of this kind changed; consumers should re-read it
    Invalidated(ResourceKind),
    /// A mutation exceeded its retry budget and was removed from the queue
    Dropped(QueuedMutation),
    /// A pass finished
    PassCompleted(SyncReport),
}
