//! Data models for Kept

mod event;
mod file;
mod mutation;
mod note;
mod resource;

pub use event::{Event, EventPatch, NewEvent, RepeatInterval};
pub use file::{FilePatch, FileRecord, FileUpload, NewFile};
pub use mutation::{
    CreatePayload, DeletePayload, MutationKind, NewMutation, QueuedMutation, UpdatePayload,
};
pub use note::{NewNote, Note, NotePatch};
pub use resource::{Resource, ResourceKind};
