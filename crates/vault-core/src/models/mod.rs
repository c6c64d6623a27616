//! Data models for the client
//!
//! `catalog` holds the server-owned records and page snapshots; `upload` holds
//! the client-side file selection and the per-file outcome of a submission.

mod catalog;
mod upload;

pub use catalog::*;
pub use upload::*;
