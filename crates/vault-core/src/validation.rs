//! Client-side upload policy
//!
//! Files are checked against the policy when they are added to the pending
//! batch. A file that fails is left out of the batch and reported back by name;
//! the rest of the selection is still accepted.

use std::path::Path;

/// Reasons a selected file is kept out of the batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Allow-list of declared content types plus an optional size ceiling.
///
/// Entries ending in `/*` match a whole top-level type, so `image/*` accepts
/// `image/png` and `image/webp` alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_content_types: Vec<String>,
    max_file_size: Option<u64>,
}

impl UploadPolicy {
    pub fn new(allowed_content_types: Vec<String>, max_file_size: Option<u64>) -> Self {
        Self {
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .filter(|ct| !ct.is_empty())
                .collect(),
            max_file_size,
        }
    }

    /// Images only, which is what the catalog server accepts.
    pub fn images_only() -> Self {
        Self::new(vec!["image/*".to_string()], None)
    }

    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if let Some(max) = self.max_file_size {
            if size > max {
                return Err(ValidationError::FileTooLarge { size, max });
            }
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.trim().to_lowercase();
        let allowed = self.allowed_content_types.iter().any(|ct| {
            match ct.strip_suffix("/*") {
                Some(top) => normalized
                    .split_once('/')
                    .is_some_and(|(t, sub)| t == top && !sub.is_empty()),
                None => ct == &normalized,
            }
        });

        if !allowed {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate everything the client can know about a selected file
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<(), ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::InvalidFilename(filename.to_string()));
        }
        self.validate_file_size(file_size)?;
        validate_mime_type(content_type)?;
        self.validate_content_type(content_type)?;
        Ok(())
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

/// Check that a declared content type is a well-formed `type/subtype`, with
/// optional `; name=value` parameters, so it can label a multipart part.
pub fn validate_mime_type(content_type: &str) -> Result<(), ValidationError> {
    let mut sections = content_type.trim().split(';');
    let essence = sections.next().unwrap_or_default().trim();
    let essence_ok = essence
        .split_once('/')
        .is_some_and(|(top, sub)| is_token(top) && is_token(sub));
    let params_ok = sections.all(|param| {
        param
            .split_once('=')
            .is_some_and(|(name, value)| is_token(name.trim()) && !value.trim().is_empty())
    });

    if essence_ok && params_ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidContentType {
            content_type: content_type.to_string(),
            allowed: Vec::new(),
        })
    }
}

/// Content type implied by a filename's extension, if it is a known one.
pub fn content_type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(content_type)
}
