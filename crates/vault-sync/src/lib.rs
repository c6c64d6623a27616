//! Upload orchestration and paginated-query synchronization.
//!
//! [`upload::UploadOrchestrator`] turns ad-hoc file selections into one
//! validated, progress-tracked batch upload at a time.
//! [`query::PageCache`] and [`query::PageSession`] keep a paginated view of the
//! server catalog, serving cached pages and refetching after invalidation.
//! [`Gallery`] wires the two: a settled upload invalidates the cache and the
//! displayed page is reloaded.

pub mod gallery;
pub mod query;
pub mod upload;

pub use gallery::Gallery;
pub use query::{PageCache, PageSession, QueryStatus, SessionSnapshot};
pub use upload::{
    AddFilesReport, Rejection, SettledOutcome, SkipReason, SubmitResult, UploadHooks,
    UploadOptions, UploadOrchestrator, UploadPhase, UploadSnapshot,
};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock shared state, recovering the guard if a hook panicked while it was held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
