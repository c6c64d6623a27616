use vault_core::models::FilePreview;
use vault_core::{PendingFile, UploadOutcome, ValidationError};

pub const UPLOADING_STATUS: &str = "Uploading...";
pub const SUCCESS_STATUS: &str = "Success! All files uploaded.";

/// Where the upload session is
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    /// Files are pending and nothing is in flight
    Selecting,
    Uploading,
    Settled(SettledOutcome),
}

/// How the last submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SettledOutcome {
    /// The server answered; some files may still have been rejected
    Completed(UploadOutcome),
    /// The request never produced a usable response
    Failed(String),
}

/// A selected file kept out of the batch by the upload policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: ValidationError,
}

#[derive(Debug, Default)]
pub(crate) struct UploadState {
    pub(crate) pending: Vec<PendingFile>,
    pub(crate) phase: UploadPhase,
    pub(crate) progress: u8,
    pub(crate) status: Option<String>,
    pub(crate) rejected: Vec<Rejection>,
    pub(crate) failed: Vec<String>,
    /// Id of the most recent submission; stale callbacks and timers compare against it
    pub(crate) submission: u64,
}

impl UploadState {
    pub(crate) fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Uploading)
    }

    /// Phase to fall back to when no submission result is on display.
    pub(crate) fn resting_phase(&self) -> UploadPhase {
        if self.pending.is_empty() {
            UploadPhase::Idle
        } else {
            UploadPhase::Selecting
        }
    }

    pub(crate) fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            pending: self.pending.iter().map(PendingFile::preview).collect(),
            phase: self.phase.clone(),
            progress: self.progress,
            status: self.status.clone(),
            rejected: self.rejected.clone(),
            failed: self.failed.clone(),
        }
    }
}

/// Read-only view of the orchestrator for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSnapshot {
    pub pending: Vec<FilePreview>,
    pub phase: UploadPhase,
    pub progress: u8,
    pub status: Option<String>,
    /// Names the policy rejected in the latest selection
    pub rejected: Vec<Rejection>,
    /// Names the server rejected in the latest submission
    pub failed: Vec<String>,
}

impl UploadSnapshot {
    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Uploading)
    }

    pub fn can_submit(&self) -> bool {
        !self.pending.is_empty() && !self.is_uploading()
    }

    pub fn pending_names(&self) -> Vec<&str> {
        self.pending.iter().map(|p| p.name.as_str()).collect()
    }

    /// Label for the submit control
    pub fn action_label(&self) -> String {
        if self.progress > 0 && self.progress < 100 {
            format!("Uploading {}%", self.progress)
        } else {
            "Start Upload".to_string()
        }
    }
}

/// Status line for a submission the server answered
pub(crate) fn status_for_outcome(outcome: &UploadOutcome) -> String {
    if outcome.is_complete_success() {
        SUCCESS_STATUS.to_string()
    } else {
        format!(
            "Saved {} file(s), {} failed: {}",
            outcome.successful.len(),
            outcome.failed.len(),
            outcome.failed.join(", ")
        )
    }
}
