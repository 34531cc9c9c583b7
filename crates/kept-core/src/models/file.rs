//! File model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::resource::{Resource, ResourceKind};

/// Metadata for a file stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Backend-assigned identifier (or a `temp_` ID before first sync).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Display file name.
    pub name: String,
    /// Storage path used to request download URLs.
    pub path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// Content MIME type.
    pub mime_type: String,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
}

/// Payload for registering file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    pub user_id: String,
    pub name: String,
    pub path: String,
    pub size_bytes: i64,
    pub mime_type: String,
}

impl NewFile {
    /// Create a validated file metadata payload.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        size_bytes: i64,
        mime_type: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let path = path.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();

        if name.is_empty() {
            return Err(Error::InvalidInput("File name cannot be empty".to_string()));
        }
        if path.is_empty() {
            return Err(Error::InvalidInput("File path cannot be empty".to_string()));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "File mime_type cannot be empty".to_string(),
            ));
        }
        if size_bytes < 0 {
            return Err(Error::InvalidInput(
                "File size_bytes cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            user_id: user_id.into(),
            name,
            path,
            size_bytes,
            mime_type,
        })
    }
}

/// Partial file metadata update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// File bytes plus metadata for the backend's upload call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub user_id: String,
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Create a validated upload request.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("File name cannot be empty".to_string()));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "File mime_type cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            user_id: user_id.into(),
            name,
            mime_type,
            bytes,
        })
    }
}

impl Resource for FileRecord {
    type Input = NewFile;
    type Patch = FilePatch;

    const KIND: ResourceKind = ResourceKind::File;

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn build(id: String, input: &NewFile, now: i64) -> Self {
        Self {
            id,
            user_id: input.user_id.clone(),
            name: input.name.clone(),
            path: input.path.clone(),
            size_bytes: input.size_bytes,
            mime_type: input.mime_type.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn patched(&self, patch: &FilePatch, now: i64) -> Self {
        Self {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            path: patch.path.clone().unwrap_or_else(|| self.path.clone()),
            updated_at: now,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_validation() {
        assert!(NewFile::new("u1", "", "a/b.png", 1, "image/png").is_err());
        assert!(NewFile::new("u1", "b.png", " ", 1, "image/png").is_err());
        assert!(NewFile::new("u1", "b.png", "a/b.png", 1, "").is_err());
        assert!(NewFile::new("u1", "b.png", "a/b.png", -1, "image/png").is_err());

        let file = NewFile::new("u1", " b.png ", "a/b.png", 10, "image/png").unwrap();
        assert_eq!(file.name, "b.png");
    }

    #[test]
    fn test_file_upload_validation() {
        assert!(FileUpload::new("u1", "", "text/plain", vec![1]).is_err());
        assert!(FileUpload::new("u1", "a.txt", "", vec![1]).is_err());
        assert!(FileUpload::new("u1", "a.txt", "text/plain", Vec::new()).is_ok());
    }

    #[test]
    fn test_files_cannot_be_archived() {
        assert!(FileRecord::archive_patch(true).is_none());
    }

    #[test]
    fn test_file_patch_renames() {
        let input = NewFile::new("u1", "a.txt", "u1/a.txt", 3, "text/plain").unwrap();
        let file = FileRecord::build("f1".to_string(), &input, 10);
        let renamed = file.patched(
            &FilePatch {
                name: Some("b.txt".to_string()),
                ..FilePatch::default()
            },
            20,
        );
        assert_eq!(renamed.name, "b.txt");
        assert_eq!(renamed.path, "u1/a.txt");
        assert_eq!(renamed.updated_at, 20);
    }
}
