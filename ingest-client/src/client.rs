//! HTTP client for the multipart upload and document ingestion endpoints.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, ETAG};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ApiError, IngestError, IngestResult};

/// Identifiers issued by the remote endpoint when a multipart upload starts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MultipartUpload {
    pub upload_id: String,
    pub file_key: String,
}

#[derive(Serialize)]
struct InitiateRequest<'a> {
    file_name: &'a str,
    file_type: &'a str,
}

#[derive(Serialize)]
struct PresignedUrlRequest<'a> {
    upload_id: &'a str,
    file_key: &'a str,
    part_number: u32,
}

#[derive(Deserialize)]
struct PresignedUrlResponse {
    presigned_url: String,
}

/// A finished part as the storage protocol expects it on completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
}

#[derive(Serialize)]
struct CompleteRequest<'a> {
    file_key: &'a str,
    parts: &'a [CompletedPart],
}

/// Body of the create-document call
#[derive(Debug, Serialize)]
pub struct CreateDocumentRequest<'a> {
    pub file_name: &'a str,
    pub file_type: &'a str,
    pub file_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_metadata: Option<&'a Map<String, Value>>,
}

/// Document record returned by the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_friendly_file_name: Option<String>,
    /// Any further fields the backend attaches
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remote ingestion API client
#[derive(Debug, Clone)]
pub struct IngestApiClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl IngestApiClient {
    /// Create a new API client
    pub fn new(config: &ApiConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IngestError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a JSON request to an API path and decode the JSON response
    async fn send_json<B, R>(&self, method: Method, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Connection {
                url: url.clone(),
                source: e,
            })?;

        ensure_success(&url, response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse { url, source: e })
    }

    /// Start a multipart upload for `file_name`
    pub async fn initiate_multipart(
        &self,
        file_name: &str,
        file_type: &str,
    ) -> Result<MultipartUpload, ApiError> {
        self.send_json(
            Method::POST,
            "/multipart-upload/",
            &InitiateRequest {
                file_name,
                file_type,
            },
        )
        .await
    }

    /// Request a fresh single-use presigned URL for one part
    pub async fn presigned_url(
        &self,
        upload_id: &str,
        file_key: &str,
        part_number: u32,
    ) -> Result<String, ApiError> {
        let response: PresignedUrlResponse = self
            .send_json(
                Method::POST,
                "/upload-url/",
                &PresignedUrlRequest {
                    upload_id,
                    file_key,
                    part_number,
                },
            )
            .await?;
        Ok(response.presigned_url)
    }

    /// PUT one part's bytes to its presigned URL.
    ///
    /// The storage endpoint authorizes through the URL itself, so no bearer
    /// credential is attached.
    pub async fn upload_part(
        &self,
        presigned_url: &str,
        body: Bytes,
        part_number: u32,
        timeout: Duration,
    ) -> Result<CompletedPart, ApiError> {
        let len = body.len();
        let response = self
            .client
            .put(presigned_url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Connection {
                url: presigned_url.to_string(),
                source: e,
            })?;

        let response = ensure_success(presigned_url, response).await?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingETag { part_number })?
            .to_string();

        debug!(part_number, bytes = len, etag = %etag, "Part uploaded");
        Ok(CompletedPart { etag, part_number })
    }

    /// Finish a multipart upload. `parts` must already be sorted by part number.
    pub async fn complete_multipart(
        &self,
        upload_id: &str,
        file_key: &str,
        parts: &[CompletedPart],
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/multipart-upload/{}", upload_id));
        let response = self
            .request(Method::PUT, &url)
            .json(&CompleteRequest { file_key, parts })
            .send()
            .await
            .map_err(|e| ApiError::Connection {
                url: url.clone(),
                source: e,
            })?;

        ensure_success(&url, response).await?;
        Ok(())
    }

    /// Create the document record for an uploaded file
    pub async fn create_document(
        &self,
        request: &CreateDocumentRequest<'_>,
    ) -> Result<DocumentRecord, ApiError> {
        self.send_json(Method::POST, "/document-uploads/", request)
            .await
    }
}

/// Map non-2xx responses to [`ApiError::Status`], keeping the body for context
async fn ensure_success(url: &str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
