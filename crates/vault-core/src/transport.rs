//! Transport seam between the sync layer and the catalog backend
//!
//! The upload orchestrator and page cache only talk to the backend through
//! [`CatalogTransport`]. The HTTP implementation lives in `vault-api-client`;
//! tests plug in an in-memory one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{PageKey, PageResult, PendingFile, UploadOutcome};

/// Bytes sent so far for the whole request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    /// Unknown until the body length is known.
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// Percentage in `0..=100`, rounded to nearest. A missing or zero total
    /// counts as 1 so the division is always defined.
    pub fn percent(&self) -> u8 {
        let total = self.total.filter(|t| *t > 0).unwrap_or(1) as f64;
        let percent = (self.loaded as f64 * 100.0 / total).round();
        percent.clamp(0.0, 100.0) as u8
    }
}

/// Callback fed by the transport while the request body streams out.
pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Backend operations the sync layer depends on
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Fetch one server-computed page
    async fn fetch_page(&self, key: &PageKey) -> AppResult<PageResult>;

    /// Send all files as one multipart request, reporting progress as bytes go out
    async fn upload(&self, files: Vec<PendingFile>, progress: ProgressFn) -> AppResult<UploadOutcome>;
}
