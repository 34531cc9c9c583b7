//! Resource kinds and the record contract shared by notes, files, and events

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The three mutable entity kinds the cache and queue operate over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Note,
    File,
    Event,
}

impl ResourceKind {
    /// Every kind, in a stable order
    pub const ALL: [Self; 3] = [Self::Note, Self::File, Self::Event];

    /// Singular lowercase name (`note`, `file`, `event`)
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::File => "file",
            Self::Event => "event",
        }
    }

    /// Plural collection name used for storage keys and REST routes
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Note => "notes",
            Self::File => "files",
            Self::Event => "events",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" | "notes" => Ok(Self::Note),
            "file" | "files" => Ok(Self::File),
            "event" | "events" => Ok(Self::Event),
            other => Err(Error::InvalidInput(format!("Unknown resource kind: {other}"))),
        }
    }
}

/// A whole-resource record as returned by the backend and mirrored in the cache.
///
/// Records are values: every change goes through [`Resource::build`] or
/// [`Resource::patched`] and yields a new record, which is what lets a single
/// optimistic builder serve all resource types.
pub trait Resource:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Payload accepted by the backend's create call
    type Input: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Partial update payload; `None` fields are left untouched
    type Patch: Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    const KIND: ResourceKind;

    fn id(&self) -> &str;

    fn user_id(&self) -> &str;

    fn updated_at(&self) -> i64;

    /// Synthesize a record from a create payload
    fn build(id: String, input: &Self::Input, now: i64) -> Self;

    /// Apply a patch, producing a new record stamped with `now`
    fn patched(&self, patch: &Self::Patch, now: i64) -> Self;

    /// Patch that flips the archived flag, if this resource can be archived
    fn archive_patch(_archived: bool) -> Option<Self::Patch> {
        None
    }

    /// The archived flag a patch sets, if any
    fn patch_archived(_patch: &Self::Patch) -> Option<bool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_parses_singular_and_plural() {
        assert_eq!("note".parse::<ResourceKind>().unwrap(), ResourceKind::Note);
        assert_eq!(" Files ".parse::<ResourceKind>().unwrap(), ResourceKind::File);
        assert_eq!("events".parse::<ResourceKind>().unwrap(), ResourceKind::Event);
        assert!("tasks".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn resource_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ResourceKind::Event).unwrap();
        assert_eq!(json, "\"event\"");
        assert_eq!(ResourceKind::Note.collection(), "notes");
    }
}
