pub mod common;
pub mod completions;
pub mod config;
pub mod events;
pub mod files;
pub mod notes;
pub mod sync;
