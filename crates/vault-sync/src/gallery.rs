//! Upload widget and product grid wired together.
//!
//! A settled upload, successful or not, invalidates the page cache before any
//! user hook runs, then the grid reloads its current page.

use std::sync::Arc;

use vault_core::{CatalogTransport, ClientConfig, PageKey};

use crate::query::{PageCache, PageSession};
use crate::upload::{SettledOutcome, SubmitResult, UploadHooks, UploadOptions, UploadOrchestrator};

#[derive(Debug, Clone)]
pub struct Gallery {
    uploads: UploadOrchestrator,
    pages: PageSession,
}

impl Gallery {
    pub fn new(
        transport: Arc<dyn CatalogTransport>,
        options: UploadOptions,
        hooks: UploadHooks,
        initial: PageKey,
    ) -> Self {
        let cache = PageCache::new(Arc::clone(&transport));
        let invalidate_cache = cache.clone();
        let hooks = hooks.prepend_settled(Arc::new(move |_: &SettledOutcome| {
            invalidate_cache.invalidate();
        }));

        Self {
            uploads: UploadOrchestrator::with_hooks(transport, options, hooks),
            pages: PageSession::new(cache, initial),
        }
    }

    pub fn from_config(
        transport: Arc<dyn CatalogTransport>,
        config: &ClientConfig,
        hooks: UploadHooks,
    ) -> Self {
        Self::new(
            transport,
            UploadOptions::from_config(config),
            hooks,
            config.initial_page_key(),
        )
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn pages(&self) -> &PageSession {
        &self.pages
    }

    /// Submit the pending batch, then refresh the page on display.
    ///
    /// A failed refresh is left on the page session's status and does not
    /// change the returned submit result.
    pub async fn upload(&self) -> SubmitResult {
        let result = self.uploads.submit().await;
        if !matches!(result, SubmitResult::Skipped(_)) {
            if let Err(err) = self.pages.load().await {
                tracing::warn!(error = %err, "Reload after upload failed");
            }
        }
        result
    }
}
