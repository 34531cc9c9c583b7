//! In-memory backend used by accessor and sync tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use super::{FileTransfer, RemoteStore};
use crate::models::{FileRecord, FileUpload, NewFile, Resource, ResourceKind};
use crate::util::now_ms;
use crate::{Error, Result};

#[derive(Default)]
pub struct FakeBackend {
    failing: AtomicBool,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    records: HashMap<ResourceKind, Vec<Value>>,
    next_id: u64,
    calls: Vec<String>,
    failing_ops: HashSet<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only calls of `op` (`create`, `update`, `archive`, ...) fail.
    pub fn fail_op(&self, op: &str, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing_ops.insert(op.to_string());
        } else {
            state.failing_ops.remove(op);
        }
    }

    /// Calls received so far, as `op:kind:target`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn records<R: Resource>(&self) -> Vec<R> {
        let state = self.state.lock().unwrap();
        state
            .records
            .get(&R::KIND)
            .map(|values| {
                values
                    .iter()
                    .map(|value| serde_json::from_value(value.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn seed<R: Resource>(&self, records: &[R]) {
        let mut state = self.state.lock().unwrap();
        let values = state.records.entry(R::KIND).or_default();
        for record in records {
            values.push(serde_json::to_value(record).unwrap());
        }
    }

    fn record_call(&self, op: &str, kind: ResourceKind, target: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{op}:{kind}:{target}"));
        if self.failing.load(Ordering::SeqCst) || state.failing_ops.contains(op) {
            return Err(Error::Remote("network error".to_string()));
        }
        Ok(())
    }

    fn insert<R: Resource>(&self, input: &R::Input) -> R {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = R::build(format!("{}-{}", R::KIND, state.next_id), input, now_ms());
        state
            .records
            .entry(R::KIND)
            .or_default()
            .push(serde_json::to_value(&record).unwrap());
        record
    }

    fn modify<R: Resource>(&self, id: &str, patch: &R::Patch) -> Option<R> {
        let mut state = self.state.lock().unwrap();
        let values = state.records.entry(R::KIND).or_default();
        for value in values.iter_mut() {
            let current: R = serde_json::from_value(value.clone()).unwrap();
            if current.id() == id {
                let next = current.patched(patch, now_ms());
                *value = serde_json::to_value(&next).unwrap();
                return Some(next);
            }
        }
        None
    }

    fn transition<R: Resource>(&self, op: &str, id: &str, archived: bool) -> Result<Option<R>> {
        self.record_call(op, R::KIND, id)?;
        let patch = R::archive_patch(archived)
            .ok_or_else(|| Error::InvalidInput(format!("{} cannot be archived", R::KIND)))?;
        Ok(self.modify::<R>(id, &patch))
    }
}

impl<R: Resource> RemoteStore<R> for FakeBackend {
    async fn list(&self, user_id: &str) -> Result<Vec<R>> {
        self.record_call("list", R::KIND, user_id)?;
        Ok(self
            .records::<R>()
            .into_iter()
            .filter(|record| record.user_id() == user_id)
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<R>> {
        self.record_call("get", R::KIND, id)?;
        Ok(self
            .records::<R>()
            .into_iter()
            .find(|record| record.id() == id))
    }

    async fn create(&self, input: &R::Input) -> Result<R> {
        self.record_call("create", R::KIND, "-")?;
        Ok(self.insert::<R>(input))
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<Option<R>> {
        self.record_call("update", R::KIND, id)?;
        Ok(self.modify::<R>(id, patch))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record_call("delete", R::KIND, id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(values) = state.records.get_mut(&R::KIND) {
            values.retain(|value| value.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }

    async fn archive(&self, id: &str) -> Result<Option<R>> {
        self.transition::<R>("archive", id, true)
    }

    async fn restore(&self, id: &str) -> Result<Option<R>> {
        self.transition::<R>("restore", id, false)
    }
}

impl FileTransfer for FakeBackend {
    async fn upload_file(&self, upload: &FileUpload) -> Result<FileRecord> {
        self.record_call("upload", ResourceKind::File, &upload.name)?;
        let input = NewFile::new(
            upload.user_id.clone(),
            upload.name.clone(),
            format!("{}/{}", upload.user_id, upload.name),
            i64::try_from(upload.bytes.len()).unwrap(),
            upload.mime_type.clone(),
        )?;
        Ok(self.insert::<FileRecord>(&input))
    }

    async fn file_download_url(&self, path: &str) -> Result<String> {
        self.record_call("download-url", ResourceKind::File, path)?;
        Ok(format!("https://files.example.com/{path}"))
    }
}
