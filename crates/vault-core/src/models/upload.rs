use std::path::{Component, Path};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::catalog::CatalogEntry;
use crate::error::{AppError, AppResult};
use crate::validation::content_type_for_filename;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A user-selected file waiting to be uploaded. The bytes are never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, taking the content type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(AppError::Io(format!("Invalid input: {}", path.display())));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Io(format!("Invalid file name: {}", path.display())))?
            .to_string();

        let data = std::fs::read(path)
            .map_err(|e| AppError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;

        let mime_type = content_type_for_filename(&name).unwrap_or(FALLBACK_CONTENT_TYPE);
        tracing::debug!(file = %name, size = data.len(), mime_type, "Loaded file from disk");

        Ok(Self::new(name, mime_type, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Cheap clone of the file contents.
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn preview(&self) -> FilePreview {
        FilePreview {
            name: self.name.clone(),
            size_bytes: self.size_bytes(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// What the UI shows for a pending file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePreview {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// Per-file result of one upload request.
///
/// Counts are whatever the server reports; they need not add up to the number
/// of files submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    #[serde(default)]
    pub successful: Vec<CatalogEntry>,
    #[serde(default)]
    pub failed: Vec<String>,
}

impl UploadOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload response body: the current `{successful, failed}` shape, or the older
/// bare list of saved entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Outcome(UploadOutcome),
    Saved(Vec<CatalogEntry>),
}

impl From<UploadResponse> for UploadOutcome {
    fn from(response: UploadResponse) -> Self {
        match response {
            UploadResponse::Outcome(outcome) => outcome,
            UploadResponse::Saved(successful) => UploadOutcome {
                successful,
                failed: Vec::new(),
            },
        }
    }
}
