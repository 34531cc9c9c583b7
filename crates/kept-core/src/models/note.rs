//! Note model

use serde::{Deserialize, Serialize};

use super::resource::{Resource, ResourceKind};

/// A note owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Backend-assigned identifier (or a `temp_` ID before first sync)
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub title: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_archived: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Note {
    /// Title, or the first content line when the title is blank, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        let source = if self.title.trim().is_empty() {
            self.content.lines().next().unwrap_or("")
        } else {
            self.title.as_str()
        };
        source.trim().chars().take(max_len).collect()
    }

    /// Check if both title and content are empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// Payload for creating a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NewNote {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            content: String::new(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Partial note update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl Resource for Note {
    type Input = NewNote;
    type Patch = NotePatch;

    const KIND: ResourceKind = ResourceKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn build(id: String, input: &NewNote, now: i64) -> Self {
        Self {
            id,
            user_id: input.user_id.clone(),
            title: input.title.clone(),
            content: input.content.clone(),
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn patched(&self, patch: &NotePatch, now: i64) -> Self {
        Self {
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            content: patch.content.clone().unwrap_or_else(|| self.content.clone()),
            is_archived: patch.is_archived.unwrap_or(self.is_archived),
            updated_at: now,
            ..self.clone()
        }
    }

    fn archive_patch(archived: bool) -> Option<NotePatch> {
        Some(NotePatch {
            is_archived: Some(archived),
            ..NotePatch::default()
        })
    }

    fn patch_archived(patch: &NotePatch) -> Option<bool> {
        patch.is_archived
    }
}
