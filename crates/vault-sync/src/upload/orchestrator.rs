use std::sync::{Arc, Mutex};
use std::time::Duration;

use vault_core::{
    validate_mime_type, AppError, CatalogTransport, ClientConfig, ErrorMetadata, LogLevel,
    PendingFile, ProgressFn, SelectionMode, TransferProgress, UploadOutcome, UploadPolicy,
};

use super::state::{
    status_for_outcome, Rejection, SettledOutcome, UploadPhase, UploadSnapshot, UploadState,
    UPLOADING_STATUS,
};
use crate::lock;

const DEFAULT_STATUS_COOLDOWN: Duration = Duration::from_millis(2000);
const INTERRUPTED_MESSAGE: &str = "Upload interrupted";

pub type ProgressHook = Arc<dyn Fn(u8) + Send + Sync>;
pub type SettledHook = Arc<dyn Fn(&SettledOutcome) + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(&UploadOutcome) + Send + Sync>;

/// Orchestrator behaviour toggles
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub selection_mode: SelectionMode,
    /// `None` accepts any file with a name
    pub policy: Option<UploadPolicy>,
    /// How long a success banner stays up before the session returns to idle
    pub status_cooldown: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Accumulate,
            policy: None,
            status_cooldown: DEFAULT_STATUS_COOLDOWN,
        }
    }
}

impl UploadOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            selection_mode: config.selection_mode,
            policy: config.upload_policy(),
            status_cooldown: config.status_cooldown,
        }
    }
}

/// Callbacks fired by the orchestrator. All run outside its internal lock, so
/// they may read [`UploadOrchestrator::snapshot`].
#[derive(Clone, Default)]
pub struct UploadHooks {
    on_progress: Option<ProgressHook>,
    on_settled: Option<SettledHook>,
    on_success: Option<SuccessHook>,
}

impl UploadHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with each new, strictly higher progress percentage
    pub fn on_progress(mut self, hook: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(hook));
        self
    }

    /// Called once per submission when it settles, success or failure
    pub fn on_settled(mut self, hook: impl Fn(&SettledOutcome) + Send + Sync + 'static) -> Self {
        self.on_settled = Some(Arc::new(hook));
        self
    }

    /// Called when the server answered, even if it rejected some files
    pub fn on_success(mut self, hook: impl Fn(&UploadOutcome) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Run `first` before any settled hook already registered.
    pub(crate) fn prepend_settled(mut self, first: SettledHook) -> Self {
        let next = self.on_settled.take();
        self.on_settled = Some(Arc::new(move |outcome: &SettledOutcome| {
            first(outcome);
            if let Some(next) = &next {
                next(outcome);
            }
        }));
        self
    }
}

impl std::fmt::Debug for UploadHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadHooks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_settled", &self.on_settled.is_some())
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

/// Result of [`UploadOrchestrator::add_files`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddFilesReport {
    pub accepted: usize,
    pub rejected: Vec<Rejection>,
}

impl AddFilesReport {
    pub fn rejected_names(&self) -> Vec<&str> {
        self.rejected.iter().map(|r| r.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyBatch,
    AlreadyUploading,
}

/// Result of [`UploadOrchestrator::submit`]
#[derive(Debug, Clone)]
pub enum SubmitResult {
    /// Nothing was sent
    Skipped(SkipReason),
    /// The server answered; `failed` may be non-empty
    Completed(UploadOutcome),
    /// The request failed before a usable response. The batch is kept after a
    /// transport failure and dropped when the request could not be built.
    Failed(AppError),
}

/// Owns the pending batch and drives at most one upload at a time.
///
/// Cloning gives another handle onto the same session. `submit` must run
/// inside a tokio runtime; the post-upload cooldown is a spawned timer.
#[derive(Clone)]
pub struct UploadOrchestrator {
    transport: Arc<dyn CatalogTransport>,
    options: UploadOptions,
    hooks: UploadHooks,
    state: Arc<Mutex<UploadState>>,
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl UploadOrchestrator {
    pub fn new(transport: Arc<dyn CatalogTransport>, options: UploadOptions) -> Self {
        Self::with_hooks(transport, options, UploadHooks::default())
    }

    pub fn with_hooks(
        transport: Arc<dyn CatalogTransport>,
        options: UploadOptions,
        hooks: UploadHooks,
    ) -> Self {
        Self {
            transport,
            options,
            hooks,
            state: Arc::new(Mutex::new(UploadState::default())),
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        lock(&self.state).snapshot()
    }

    /// Add a selection to the batch.
    ///
    /// Files failing the policy are reported and skipped; the rest are kept.
    /// Outside of an upload this also clears the previous attempt's status and
    /// progress.
    pub fn add_files(&self, incoming: impl IntoIterator<Item = PendingFile>) -> AddFilesReport {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for file in incoming {
            if file.name().trim().is_empty() {
                tracing::debug!("Skipping unnamed file in selection");
                continue;
            }
            let checked = match &self.options.policy {
                Some(policy) => {
                    policy.validate_all(file.name(), file.mime_type(), file.size_bytes())
                }
                None => validate_mime_type(file.mime_type()),
            };
            if let Err(reason) = checked {
                tracing::warn!(file = %file.name(), %reason, "File rejected by upload policy");
                rejected.push(Rejection {
                    name: file.name().to_string(),
                    reason,
                });
                continue;
            }
            accepted.push(file);
        }

        let report = AddFilesReport {
            accepted: accepted.len(),
            rejected: rejected.clone(),
        };

        let mut state = lock(&self.state);
        match self.options.selection_mode {
            SelectionMode::Accumulate => state.pending.extend(accepted),
            SelectionMode::Replace => state.pending = accepted,
        }
        state.rejected = rejected;

        // A running upload keeps its own progress and banner.
        if !state.is_uploading() {
            state.progress = 0;
            state.status = None;
            state.failed.clear();
            state.phase = state.resting_phase();
        }

        tracing::debug!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            pending = state.pending.len(),
            "Selection added"
        );
        report
    }

    /// Remove one pending file by position. Out-of-range indexes are ignored.
    pub fn remove_file(&self, index: usize) -> Option<PendingFile> {
        let mut state = lock(&self.state);
        if index >= state.pending.len() {
            return None;
        }
        let removed = state.pending.remove(index);
        if matches!(state.phase, UploadPhase::Selecting) {
            state.phase = state.resting_phase();
        }
        Some(removed)
    }

    /// Drop every pending file.
    pub fn clear_pending(&self) {
        let mut state = lock(&self.state);
        state.pending.clear();
        if matches!(state.phase, UploadPhase::Selecting) {
            state.phase = UploadPhase::Idle;
        }
    }

    /// Upload the pending batch as one request.
    ///
    /// A call while another submission is in flight, or with nothing pending,
    /// is a no-op. Per-file rejections by the server still count as a completed
    /// submission; only a failed request keeps the batch for a manual retry.
    ///
    /// Dropping the returned future before it resolves puts the batch back and
    /// settles the submission as interrupted. No hooks run in that case.
    pub async fn submit(&self) -> SubmitResult {
        let (files, submission) = {
            let mut state = lock(&self.state);
            if state.is_uploading() {
                tracing::debug!("Upload already in flight, ignoring submit");
                return SubmitResult::Skipped(SkipReason::AlreadyUploading);
            }
            if state.pending.is_empty() {
                return SubmitResult::Skipped(SkipReason::EmptyBatch);
            }
            state.submission += 1;
            state.phase = UploadPhase::Uploading;
            state.progress = 0;
            state.status = Some(UPLOADING_STATUS.to_string());
            state.failed.clear();
            (std::mem::take(&mut state.pending), state.submission)
        };

        tracing::info!(submission, files = files.len(), "Starting upload");
        let in_flight = InFlight {
            state: Arc::clone(&self.state),
            submission,
            files: Some(files.clone()),
        };

        let result = self
            .transport
            .upload(files, self.progress_fn(submission))
            .await;

        let files = in_flight.disarm();
        match result {
            Ok(outcome) => self.settle_completed(submission, outcome),
            Err(err) => self.settle_failed(submission, files, err),
        }
    }

    fn progress_fn(&self, submission: u64) -> ProgressFn {
        let state = Arc::clone(&self.state);
        let hook = self.hooks.on_progress.clone();
        Arc::new(move |progress: TransferProgress| {
            let percent = progress.percent();
            let advanced = {
                let mut state = lock(&state);
                if state.submission == submission && state.is_uploading() && percent > state.progress
                {
                    state.progress = percent;
                    true
                } else {
                    false
                }
            };
            if advanced {
                if let Some(hook) = &hook {
                    hook(percent);
                }
            }
        })
    }

    fn settle_completed(&self, submission: u64, outcome: UploadOutcome) -> SubmitResult {
        let status = status_for_outcome(&outcome);
        if outcome.is_complete_success() {
            tracing::info!(
                submission,
                saved = outcome.successful.len(),
                "Upload completed"
            );
        } else {
            tracing::warn!(
                submission,
                saved = outcome.successful.len(),
                failed = ?outcome.failed,
                "Upload completed with rejected files"
            );
        }

        let finished_progress = {
            let mut state = lock(&self.state);
            let advanced = state.progress < 100;
            state.phase = UploadPhase::Settled(SettledOutcome::Completed(outcome.clone()));
            state.progress = 100;
            state.status = Some(status);
            state.failed = outcome.failed.clone();
            advanced
        };

        self.schedule_reset(submission);

        if finished_progress {
            if let Some(hook) = &self.hooks.on_progress {
                hook(100);
            }
        }

        if let Some(hook) = &self.hooks.on_settled {
            hook(&SettledOutcome::Completed(outcome.clone()));
        }
        if let Some(hook) = &self.hooks.on_success {
            hook(&outcome);
        }

        SubmitResult::Completed(outcome)
    }

    fn settle_failed(
        &self,
        submission: u64,
        files: Vec<PendingFile>,
        err: AppError,
    ) -> SubmitResult {
        match err.log_level() {
            LogLevel::Error => {
                tracing::error!(submission, error = %err, code = err.error_code(), "Upload failed")
            }
            LogLevel::Warn => {
                tracing::warn!(submission, error = %err, code = err.error_code(), "Upload rejected")
            }
            LogLevel::Debug => {
                tracing::debug!(submission, error = %err, code = err.error_code(), "Upload rejected")
            }
        }
        let message = err.client_message();

        {
            let mut state = lock(&self.state);
            if err.is_transport_failure() {
                restore_batch(&mut state, files);
            } else {
                // Resending the same files would fail the same way
                tracing::warn!(
                    submission,
                    dropped = files.len(),
                    "Dropping batch that cannot be sent"
                );
                state.failed = files.iter().map(|f| f.name().to_string()).collect();
            }
            state.phase = UploadPhase::Settled(SettledOutcome::Failed(message.clone()));
            state.status = Some(format!("Failed to upload: {}", message));
        }

        if let Some(hook) = &self.hooks.on_settled {
            hook(&SettledOutcome::Failed(message));
        }

        SubmitResult::Failed(err)
    }

    /// Return to idle after the cooldown unless something newer happened.
    fn schedule_reset(&self, submission: u64) {
        let state = Arc::clone(&self.state);
        let cooldown = self.options.status_cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let mut state = lock(&state);
            let showing_result = matches!(
                state.phase,
                UploadPhase::Settled(SettledOutcome::Completed(_))
            );
            if state.submission == submission && showing_result {
                state.phase = state.resting_phase();
                state.progress = 0;
                state.status = None;
                tracing::debug!(submission, "Upload status cleared");
            }
        });
    }
}

/// Put a submitted batch back ahead of files selected while it was in flight.
fn restore_batch(state: &mut UploadState, files: Vec<PendingFile>) {
    let added_during_flight = std::mem::take(&mut state.pending);
    state.pending = files;
    state.pending.extend(added_during_flight);
}

/// Holds a submitted batch until the submission settles. If the submit future
/// is dropped first, the batch goes back to the pending list.
struct InFlight {
    state: Arc<Mutex<UploadState>>,
    submission: u64,
    files: Option<Vec<PendingFile>>,
}

impl InFlight {
    fn disarm(mut self) -> Vec<PendingFile> {
        self.files.take().unwrap_or_default()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(files) = self.files.take() else {
            return;
        };
        let mut state = lock(&self.state);
        if state.submission != self.submission || !state.is_uploading() {
            return;
        }
        tracing::warn!(
            submission = self.submission,
            files = files.len(),
            "Upload interrupted before it settled"
        );
        restore_batch(&mut state, files);
        state.phase =
            UploadPhase::Settled(SettledOutcome::Failed(INTERRUPTED_MESSAGE.to_string()));
        state.status = Some(format!("Failed to upload: {}", INTERRUPTED_MESSAGE));
    }
}
