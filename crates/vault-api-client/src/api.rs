//! Catalog methods for the API client.
//!
//! `list_products` maps one [`PageKey`] onto `GET /products`;
//! `upload_products` sends the whole batch as one multipart request whose
//! parts are streamed in chunks so upload progress can be counted as bytes
//! leave the client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use vault_core::models::UploadResponse;
use vault_core::{
    AppError, AppResult, CatalogTransport, PageKey, PageResult, PendingFile, ProgressFn,
    TransferProgress, UploadOutcome, ValidationError,
};

use crate::ApiClient;

const PRODUCTS_PATH: &str = "/products";
const UPLOAD_PATH: &str = "/products/upload";
/// Form field name repeated once per file
const FILES_FIELD: &str = "files";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

impl ApiClient {
    /// Fetch one page of the catalog, sorted and paginated by the server.
    pub async fn list_products(&self, key: &PageKey) -> AppResult<PageResult> {
        tracing::debug!(page = %key, "Fetching catalog page");
        self.get(PRODUCTS_PATH, &key.query_pairs()).await
    }

    /// Upload every file as a `files` part of one multipart request.
    pub async fn upload_products(
        &self,
        files: Vec<PendingFile>,
        progress: ProgressFn,
    ) -> AppResult<UploadOutcome> {
        let total: u64 = files.iter().map(PendingFile::size_bytes).sum();
        let sent = Arc::new(AtomicU64::new(0));

        tracing::info!(files = files.len(), total_bytes = total, "Uploading batch");

        let mut form = Form::new();
        for file in files {
            form = form.part(
                FILES_FIELD,
                counted_part(&file, Arc::clone(&sent), total, Arc::clone(&progress))?,
            );
        }

        let response: UploadResponse = self.post_multipart(UPLOAD_PATH, form).await?;
        Ok(response.into())
    }
}

/// Build a streamed part that reports cumulative bytes sent for the whole batch.
fn counted_part(
    file: &PendingFile,
    sent: Arc<AtomicU64>,
    total: u64,
    progress: ProgressFn,
) -> AppResult<Part> {
    let data = file.data();
    let len = data.len();
    let chunks: Vec<Bytes> = (0..len)
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(len)))
        .collect();

    let body_stream = stream::iter(chunks).map(move |chunk| {
        let loaded = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
        progress(TransferProgress::new(loaded, Some(total)));
        Ok::<Bytes, std::io::Error>(chunk)
    });

    Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), len as u64)
        .file_name(file.name().to_string())
        .mime_str(file.mime_type())
        .map_err(|_| {
            AppError::Validation(ValidationError::InvalidContentType {
                content_type: file.mime_type().to_string(),
                allowed: Vec::new(),
            })
        })
}

#[async_trait]
impl CatalogTransport for ApiClient {
    async fn fetch_page(&self, key: &PageKey) -> AppResult<PageResult> {
        self.list_products(key).await
    }

    async fn upload(&self, files: Vec<PendingFile>, progress: ProgressFn) -> AppResult<UploadOutcome> {
        self.upload_products(files, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::Mutex;
    use vault_core::SortDirection;

    fn page_body() -> String {
        serde_json::json!({
            "content": [
                {"id": 13, "name": "cat.jpg", "description": "Uploaded via Bulk API", "imageUrl": "/uploads/PV-13/cat.jpg"},
                {"id": 12, "name": "dog.png", "description": "Uploaded via Bulk API", "imageUrl": "/uploads/PV-12/dog.png"}
            ],
            "pageNo": 1,
            "pageSize": 2,
            "totalElements": 13,
            "totalPages": 7,
            "last": false
        })
        .to_string()
    }

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressFn = Arc::new(move |p: TransferProgress| {
            sink.lock().unwrap().push(p.percent());
        });
        (progress, seen)
    }

    #[tokio::test]
    async fn test_list_products_sends_page_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageNo".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "2".into()),
                Matcher::UrlEncoded("sortBy".into(), "name".into()),
                Matcher::UrlEncoded("sortType".into(), "asc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_body())
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let key = PageKey::new(1, 2, "name", SortDirection::Asc);
        let page = client.list_products(&key).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.total_elements, 13);
        assert_eq!(page.entries[0].image_url, "/uploads/PV-13/cat.jpg");
    }

    #[tokio::test]
    async fn test_list_products_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/products")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"status":500,"error":"Internal Error","message":"boom"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.list_products(&PageKey::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Api { status: 500, ref message } if message == "boom"));
    }

    #[tokio::test]
    async fn test_list_products_bad_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/products")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let err = client.list_products(&PageKey::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_upload_products_partial_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/products/upload")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="files"; filename="cat.jpg""#.to_string()),
                Matcher::Regex(r#"name="files"; filename="C.png""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "successful": [{"id": 20, "name": "cat.jpg", "description": "", "imageUrl": "/uploads/PV-20/cat.jpg"}],
                    "failed": ["C.png"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let files = vec![
            PendingFile::new("cat.jpg", "image/jpeg", vec![1u8; 150 * 1024]),
            PendingFile::new("C.png", "image/png", vec![2u8; 10]),
        ];
        let (progress, seen) = recorder();
        let outcome = client.upload_products(files, progress).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.successful.len(), 1);
        assert_eq!(outcome.failed, vec!["C.png".to_string()]);

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_upload_products_legacy_array() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/products/upload")
            .with_status(200)
            .with_body(r#"[{"id": 3, "name": "dog.png"}]"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let (progress, _) = recorder();
        let outcome = client
            .upload_products(vec![PendingFile::new("dog.png", "image/png", vec![0u8; 4])], progress)
            .await
            .unwrap();
        assert!(outcome.is_complete_success());
        assert_eq!(outcome.successful[0].id, 3);
    }

    #[tokio::test]
    async fn test_upload_products_too_large() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/products/upload")
            .with_status(417)
            .with_body(r#"{"error":"File Too Large","message":"One or more files exceed the maximum size limit."}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), None).unwrap();
        let (progress, _) = recorder();
        let err = client
            .upload_products(vec![PendingFile::new("huge.png", "image/png", vec![0u8; 8])], progress)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(err.is_transport_failure());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client.list_products(&PageKey::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[test]
    fn test_invalid_mime_rejected() {
        let file = PendingFile::new("weird.bin", "not a mime", vec![1u8]);
        let (progress, _) = recorder();
        let err = counted_part(&file, Arc::new(AtomicU64::new(0)), 1, progress).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
