//! Configuration module
//!
//! Client settings come from the environment (after loading `.env`). Every
//! value has a default matching the catalog server's own defaults, so an empty
//! environment gives a working client against a local server.

use std::env;
use std::time::Duration;

use crate::models::{PageKey, SortDirection, DEFAULT_PAGE_SIZE, DEFAULT_SORT_BY};
use crate::validation::UploadPolicy;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "image/*";
const MAX_FILE_SIZE_MB: u64 = 10;
const STATUS_COOLDOWN_MS: u64 = 2000;

/// What a new selection does to files already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// New files are appended; repeated drops compose
    #[default]
    Accumulate,
    /// New files replace the pending batch
    Replace,
}

impl SelectionMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "accumulate" | "append" => Some(SelectionMode::Accumulate),
            "replace" => Some(SelectionMode::Replace),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    /// No timeout unless set explicitly
    pub http_timeout: Option<Duration>,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_direction: SortDirection,
    pub selection_mode: SelectionMode,
    /// Empty means no client-side content type check
    pub allowed_content_types: Vec<String>,
    pub max_file_size_bytes: Option<u64>,
    pub status_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: None,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_direction: SortDirection::Desc,
            selection_mode: SelectionMode::Accumulate,
            allowed_content_types: vec![DEFAULT_ALLOWED_CONTENT_TYPES.to_string()],
            max_file_size_bytes: Some(MAX_FILE_SIZE_MB * 1024 * 1024),
            status_cooldown: Duration::from_millis(STATUS_COOLDOWN_MS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("VAULT_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let http_timeout = match lookup("VAULT_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|_| {
                anyhow::anyhow!("VAULT_HTTP_TIMEOUT_SECS must be a whole number of seconds")
            })?)),
            None => None,
        };

        let page_size = lookup("VAULT_PAGE_SIZE")
            .unwrap_or_else(|| DEFAULT_PAGE_SIZE.to_string())
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("VAULT_PAGE_SIZE must be a valid number"))?;

        let sort_by = lookup("VAULT_SORT_BY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SORT_BY.to_string());

        let sort_direction = lookup("VAULT_SORT_DIRECTION")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let selection_mode = match lookup("VAULT_SELECTION_MODE") {
            Some(raw) => SelectionMode::parse(&raw).ok_or_else(|| {
                anyhow::anyhow!("VAULT_SELECTION_MODE must be 'accumulate' or 'replace'")
            })?,
            None => SelectionMode::default(),
        };

        let allowed_content_types = lookup("VAULT_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| DEFAULT_ALLOWED_CONTENT_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = lookup("VAULT_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|| MAX_FILE_SIZE_MB.to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("VAULT_MAX_FILE_SIZE_MB must be a valid number"))?;

        let status_cooldown_ms = lookup("VAULT_STATUS_COOLDOWN_MS")
            .unwrap_or_else(|| STATUS_COOLDOWN_MS.to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("VAULT_STATUS_COOLDOWN_MS must be a valid number"))?;

        Ok(Self {
            api_url,
            http_timeout,
            page_size,
            sort_by,
            sort_direction,
            selection_mode,
            allowed_content_types,
            // 0 disables the size check
            max_file_size_bytes: (max_file_size_mb > 0).then(|| max_file_size_mb * 1024 * 1024),
            status_cooldown: Duration::from_millis(status_cooldown_ms),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "VAULT_API_URL must start with http:// or https:// (got '{}')",
                self.api_url
            ));
        }
        if self.page_size == 0 {
            return Err(anyhow::anyhow!("VAULT_PAGE_SIZE must be greater than zero"));
        }
        Ok(())
    }

    /// Upload policy, or `None` when no content types are configured.
    pub fn upload_policy(&self) -> Option<UploadPolicy> {
        if self.allowed_content_types.is_empty() {
            return None;
        }
        Some(UploadPolicy::new(
            self.allowed_content_types.clone(),
            self.max_file_size_bytes,
        ))
    }

    /// First page under the configured size and sort.
    pub fn initial_page_key(&self) -> PageKey {
        PageKey::new(0, self.page_size, self.sort_by.clone(), self.sort_direction)
    }
}
