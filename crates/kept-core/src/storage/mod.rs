//! Persisted key-value storage used by the cache and the mutation queue.
//!
//! Values are opaque strings (serialized JSON blobs). Implementations must be
//! safe to share between the accessors and the sync engine.

mod memory;

use std::future::Future;

pub use memory::MemoryStore;

use crate::Result;

/// Async string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
