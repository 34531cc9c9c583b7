//! Locally synthesized records returned before the backend has answered.

use uuid::Uuid;

use crate::models::Resource;
use crate::util::now_ms;

/// Prefix of every ID minted for an offline create
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Mint a temporary ID: `temp_<unix ms>_<8 hex chars>`.
pub fn temporary_id() -> String {
    let random = Uuid::now_v7().simple().to_string();
    // The leading hex of a v7 UUID is the timestamp; take the random tail.
    let suffix = &random[random.len() - 8..];
    format!("{TEMP_ID_PREFIX}{}_{suffix}", now_ms())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Record standing in for a create that has not reached the backend.
pub fn created<R: Resource>(input: &R::Input) -> R {
    R::build(temporary_id(), input, now_ms())
}

/// `current` with `patch` applied. `updated_at` never moves backwards.
pub fn updated<R: Resource>(current: &R, patch: &R::Patch) -> R {
    let now = now_ms().max(current.updated_at());
    current.patched(patch, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNote, Note, NotePatch};

    #[test]
    fn temporary_ids_are_prefixed_and_unique() {
        let first = temporary_id();
        let second = temporary_id();

        assert!(is_temporary_id(&first));
        assert_ne!(first, second);
        let parts: Vec<&str> = first.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(!is_temporary_id("note-1"));
    }

    #[test]
    fn created_record_carries_input() {
        let input = NewNote::new("user-1", "Groceries").with_content("milk");
        let note: Note = created(&input);

        assert!(is_temporary_id(&note.id));
        assert_eq!(note.user_id, "user-1");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk");
        assert!(!note.is_archived);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn updated_record_keeps_untouched_fields() {
        let mut note: Note = created(&NewNote::new("user-1", "Draft").with_content("body"));
        note.updated_at = i64::MAX - 1;
        let patch = NotePatch {
            title: Some("Final".to_string()),
            ..NotePatch::default()
        };

        let next = updated(&note, &patch);
        assert_eq!(next.title, "Final");
        assert_eq!(next.content, "body");
        assert_eq!(next.id, note.id);
        assert_eq!(next.updated_at, i64::MAX - 1);
    }
}
