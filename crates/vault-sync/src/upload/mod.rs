//! Upload orchestration: pending batch, single in-flight submission, progress
//! and outcome reconciliation.

mod orchestrator;
mod state;

pub use orchestrator::{
    AddFilesReport, SkipReason, SubmitResult, UploadHooks, UploadOptions, UploadOrchestrator,
};
pub use state::{
    Rejection, SettledOutcome, UploadPhase, UploadSnapshot, SUCCESS_STATUS, UPLOADING_STATUS,
};
