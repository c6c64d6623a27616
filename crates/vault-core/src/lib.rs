//! Product Vault Core Library
//!
//! This crate provides the domain models, error type, configuration, upload
//! policy and transport trait shared by the API client, the sync layer and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, SelectionMode};
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use models::{
    CatalogEntry, PageKey, PageResult, PendingFile, SortDirection, UploadOutcome,
};
pub use transport::{CatalogTransport, ProgressFn, TransferProgress};
pub use validation::{validate_mime_type, UploadPolicy, ValidationError};
