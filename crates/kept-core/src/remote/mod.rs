//! Contract of the hosted backend, one CRUD surface per resource type.
//!
//! The core does not distinguish error kinds coming back from the backend:
//! a call either succeeds or fails.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;

pub use http::HttpBackend;

use crate::models::{Event, FileRecord, FileUpload, Note, Resource};
use crate::Result;

/// Remote CRUD operations for one resource type.
pub trait RemoteStore<R: Resource>: Send + Sync {
    /// Every record owned by `user_id`.
    fn list(&self, user_id: &str) -> impl Future<Output = Result<Vec<R>>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<R>>> + Send;

    fn create(&self, input: &R::Input) -> impl Future<Output = Result<R>> + Send;

    /// Apply a partial update; `None` when the record does not exist.
    fn update(&self, id: &str, patch: &R::Patch) -> impl Future<Output = Result<Option<R>>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Dedicated archive transition (not a field patch on the backend).
    fn archive(&self, id: &str) -> impl Future<Output = Result<Option<R>>> + Send;

    /// Dedicated restore transition.
    fn restore(&self, id: &str) -> impl Future<Output = Result<Option<R>>> + Send;
}

/// File byte transfer operations.
pub trait FileTransfer: Send + Sync {
    fn upload_file(&self, upload: &FileUpload) -> impl Future<Output = Result<FileRecord>> + Send;

    fn file_download_url(&self, path: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Everything the accessors and the sync engine need from the backend.
pub trait Backend:
    RemoteStore<Note> + RemoteStore<FileRecord> + RemoteStore<Event> + FileTransfer
{
}

impl<T> Backend for T where
    T: RemoteStore<Note> + RemoteStore<FileRecord> + RemoteStore<Event> + FileTransfer
{
}

/// Send an update, routing archived-flag changes through archive/restore.
pub async fn apply_update<R, B>(backend: &B, id: &str, patch: &R::Patch) -> Result<Option<R>>
where
    R: Resource,
    B: RemoteStore<R>,
{
    match R::patch_archived(patch) {
        Some(true) => RemoteStore::<R>::archive(backend, id).await,
        Some(false) => RemoteStore::<R>::restore(backend, id).await,
        None => RemoteStore::<R>::update(backend, id, patch).await,
    }
}
