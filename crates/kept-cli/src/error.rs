use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] kept_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Record ID cannot be empty")]
    EmptyId,
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("Nothing to change; pass at least one field to update")]
    EmptyPatch,
    #[error("Invalid date '{0}'; use YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No API base URL configured. Run `kept config init --api-base-url <URL>`.")]
    NotConfigured,
    #[error("No user configured. Run `kept config init --user-id <ID>` or set KEPT_USER_ID.")]
    NoUser,
}
