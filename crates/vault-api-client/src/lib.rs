//! HTTP client for the Product Vault catalog API.
//!
//! Provides a minimal client with generic GET and multipart POST helpers and
//! the catalog methods (page listing, bulk upload) in [`api`]. The client
//! implements [`vault_core::CatalogTransport`], so the sync layer can drive it
//! directly.

pub mod api;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use vault_core::{AppError, AppResult, ClientConfig};

/// Error body the catalog server sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the catalog API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> AppResult<Self> {
        Self::new(config.api_url.clone(), config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let url = self.build_url(path);
        let mut request = self.client.get(&url);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        Self::read_json(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> AppResult<T> {
        let url = self.build_url(path);
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(error_from_status(status, &error_text));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a non-2xx status and body onto an [`AppError`], preferring the server's
/// own message when the body is its error envelope.
fn error_from_status(status: StatusCode, body: &str) -> AppError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        Ok(ErrorEnvelope {
            error: Some(error), ..
        }) if !error.is_empty() => error,
        _ if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        _ => body.trim().to_string(),
    };

    match status {
        StatusCode::PAYLOAD_TOO_LARGE | StatusCode::EXPECTATION_FAILED => {
            AppError::PayloadTooLarge(message)
        }
        _ => AppError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

// Re-export domain types for convenience.
pub use vault_core::models::{CatalogEntry, PageKey, PageResult, UploadOutcome};
