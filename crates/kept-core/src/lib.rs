//! kept-core - Offline-aware sync layer for Kept
//!
//! This crate contains the shared models, local cache, mutation queue, and
//! sync engine used by every Kept client to keep notes, files, and events
//! usable without a connection.

pub mod accessor;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod network;
pub mod optimistic;
pub mod queue;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod util;

pub use accessor::{OfflineClient, ResourceAccessor};
pub use cache::CacheStore;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{Event, FileRecord, Note, ResourceKind};
pub use network::{ConnectivityState, NetworkMonitor};
pub use queue::MutationQueue;
pub use remote::HttpBackend;
pub use sync::{SyncEngine, SyncEvent, SyncReport};
