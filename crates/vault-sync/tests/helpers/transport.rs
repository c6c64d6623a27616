use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use vault_core::{
    AppError, AppResult, CatalogEntry, CatalogTransport, PageKey, PageResult, PendingFile,
    ProgressFn, SortDirection, TransferProgress, UploadOutcome,
};

/// In-memory catalog server.
///
/// Pages are sorted by id. Uploads save every file unless an outcome was
/// scripted with [`FakeTransport::push_upload_result`]. Either call can be
/// held open with a gate until the test releases it.
#[derive(Default)]
pub struct FakeTransport {
    catalog: Mutex<Vec<CatalogEntry>>,
    upload_results: Mutex<VecDeque<AppResult<UploadOutcome>>>,
    progress_script: Mutex<Vec<u8>>,
    upload_gate: Mutex<Option<Arc<Notify>>>,
    fetch_gate: Mutex<Option<Arc<Notify>>>,
    fetch_error: Mutex<Option<AppError>>,
    fetches: Mutex<Vec<PageKey>>,
    uploads: Mutex<Vec<Vec<String>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_catalog(entries: Vec<CatalogEntry>) -> Arc<Self> {
        let transport = Self::default();
        *transport.catalog.lock().unwrap() = entries;
        Arc::new(transport)
    }

    pub fn push_upload_result(&self, result: AppResult<UploadOutcome>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    /// Percentages reported during the next uploads, out of a 100-byte body
    pub fn set_progress_script(&self, percents: &[u8]) {
        *self.progress_script.lock().unwrap() = percents.to_vec();
    }

    /// Hold uploads until the returned gate is notified
    pub fn gate_uploads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold page fetches until the returned gate is notified
    pub fn gate_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.fetch_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_fetches(&self, error: Option<AppError>) {
        *self.fetch_error.lock().unwrap() = error;
    }

    pub fn add_entry(&self, entry: CatalogEntry) {
        self.catalog.lock().unwrap().push(entry);
    }

    pub fn fetches(&self) -> Vec<PageKey> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    /// File names of each upload request, in call order
    pub fn uploads(&self) -> Vec<Vec<String>> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    fn page(&self, key: &PageKey) -> PageResult {
        let mut entries = self.catalog.lock().unwrap().clone();
        entries.sort_by_key(|e| e.id);
        if key.sort_direction == SortDirection::Desc {
            entries.reverse();
        }

        let total_elements = entries.len() as u64;
        let size = key.page_size.max(1) as usize;
        let total_pages = entries.len().div_ceil(size) as u32;
        let content = entries
            .into_iter()
            .skip(key.page_number as usize * size)
            .take(size)
            .collect();

        PageResult {
            entries: content,
            page_number: key.page_number,
            page_size: key.page_size,
            total_elements,
            total_pages,
            is_last_page: key.page_number + 1 >= total_pages,
        }
    }

    fn save_all(&self, files: &[PendingFile]) -> UploadOutcome {
        let mut catalog = self.catalog.lock().unwrap();
        let mut next_id = catalog.iter().map(|e| e.id).max().unwrap_or(0);
        let successful: Vec<CatalogEntry> = files
            .iter()
            .map(|file| {
                next_id += 1;
                super::fixtures::entry(next_id, file.name())
            })
            .collect();
        catalog.extend(successful.iter().cloned());
        UploadOutcome {
            successful,
            failed: Vec::new(),
        }
    }
}

#[async_trait]
impl CatalogTransport for FakeTransport {
    async fn fetch_page(&self, key: &PageKey) -> AppResult<PageResult> {
        self.fetches.lock().unwrap().push(key.clone());
        let gate = self.fetch_gate.lock().unwrap().clone();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        if let Some(err) = self.fetch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.page(key))
    }

    async fn upload(&self, files: Vec<PendingFile>, progress: ProgressFn) -> AppResult<UploadOutcome> {
        self.uploads
            .lock()
            .unwrap()
            .push(files.iter().map(|f| f.name().to_string()).collect());

        let gate = self.upload_gate.lock().unwrap().clone();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        let script = self.progress_script.lock().unwrap().clone();
        for percent in script {
            progress(TransferProgress::new(percent as u64, Some(100)));
        }

        let scripted = self.upload_results.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(outcome)) => {
                self.catalog
                    .lock()
                    .unwrap()
                    .extend(outcome.successful.iter().cloned());
                Ok(outcome)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.save_all(&files)),
        }
    }
}
