//! Queued mutation model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::resource::{Resource, ResourceKind};

/// Write operation captured for later replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A persisted write deferred for replay against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Queue-local identifier (time-ordered, random suffix)
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub resource: ResourceKind,
    /// Opaque payload; see [`CreatePayload`], [`UpdatePayload`], [`DeletePayload`]
    pub data: Value,
    /// Enqueue time (Unix ms)
    pub timestamp: i64,
    /// Failed replay attempts so far
    #[serde(default)]
    pub retries: u32,
}

impl QueuedMutation {
    /// The record this mutation targets, if the payload names one
    pub fn record_id(&self) -> Option<&str> {
        self.data
            .get("id")
            .or_else(|| self.data.get("temp_id"))
            .and_then(Value::as_str)
    }
}

/// A mutation about to be appended to the queue
#[derive(Debug, Clone, PartialEq)]
pub struct NewMutation {
    pub kind: MutationKind,
    pub resource: ResourceKind,
    pub data: Value,
}

impl NewMutation {
    /// Queue a create; `temp_id` names the optimistic record standing in for it
    pub fn create<R: Resource>(temp_id: Option<String>, input: &R::Input) -> Result<Self> {
        let payload = CreatePayload {
            temp_id,
            input: input.clone(),
        };
        Ok(Self {
            kind: MutationKind::Create,
            resource: R::KIND,
            data: serde_json::to_value(payload)?,
        })
    }

    pub fn update<R: Resource>(id: &str, patch: &R::Patch) -> Result<Self> {
        let payload = UpdatePayload {
            id: id.to_string(),
            patch: patch.clone(),
        };
        Ok(Self {
            kind: MutationKind::Update,
            resource: R::KIND,
            data: serde_json::to_value(payload)?,
        })
    }

    pub fn delete<R: Resource>(id: &str) -> Self {
        Self {
            kind: MutationKind::Delete,
            resource: R::KIND,
            data: serde_json::json!({ "id": id }),
        }
    }
}

/// Payload of a queued create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayload<I> {
    #[serde(default)]
    pub temp_id: Option<String>,
    pub input: I,
}

/// Payload of a queued update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload<P> {
    pub id: String,
    pub patch: P,
}

/// Payload of a queued delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, NewNote, Note};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mutation_serializes_type_field() {
        let mutation = QueuedMutation {
            id: "m1".to_string(),
            kind: MutationKind::Delete,
            resource: ResourceKind::Event,
            data: serde_json::json!({ "id": "e1" }),
            timestamp: 1,
            retries: 0,
        };
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["type"], "delete");
        assert_eq!(json["resource"], "event");
        assert_eq!(mutation.record_id(), Some("e1"));
    }

    #[test]
    fn test_create_payload_shape() {
        let mutation = NewMutation::create::<Note>(
            Some("temp_1_abc".to_string()),
            &NewNote::new("u1", "X"),
        )
        .unwrap();
        assert_eq!(mutation.kind, MutationKind::Create);
        assert_eq!(mutation.resource, ResourceKind::Note);
        assert_eq!(
            mutation.data,
            serde_json::json!({
                "temp_id": "temp_1_abc",
                "input": { "user_id": "u1", "title": "X", "content": "" }
            })
        );
    }

    #[test]
    fn test_delete_payload_names_record() {
        let mutation = NewMutation::delete::<Event>("e9");
        assert_eq!(mutation.data, serde_json::json!({ "id": "e9" }));
        let payload: DeletePayload = serde_json::from_value(mutation.data).unwrap();
        assert_eq!(payload.id, "e9");
    }
}
