//! Remote media storage (ImageKit)
//!
//! Uploads staged audio files and returns a durable public URL. Uploads are
//! multipart POSTs authenticated with the private key over HTTP basic auth.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;

pub const IMAGEKIT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
pub const IMAGEKIT_API_BASE_URL: &str = "https://api.imagekit.io/v1";
const USER_AGENT: &str = concat!("MoodTunes/", env!("CARGO_PKG_VERSION"));

/// Media store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Storage request timed out")]
    Timeout,

    #[error("Storage API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Invalid storage credentials")]
    InvalidCredentials,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StorageError::Timeout
        } else {
            StorageError::NetworkError(e.to_string())
        }
    }
}

/// A stored media object
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    /// Durable public URL
    pub url: String,
    /// Provider object id, needed to delete the object
    pub file_id: Option<String>,
    /// Name the object was stored under
    pub name: String,
}

/// Durable storage for uploaded audio
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload a local file under `file_name`
    async fn upload(&self, path: &Path, file_name: &str) -> Result<StoredMedia, StorageError>;

    /// Delete a previously uploaded object
    async fn delete(&self, file_id: &str) -> Result<(), StorageError>;
}

/// ImageKit account credentials
#[derive(Clone)]
pub struct ImageKitCredentials {
    pub public_key: String,
    pub private_key: String,
    /// Account URL endpoint, e.g. `https://ik.imagekit.io/<id>`
    pub url_endpoint: String,
}

impl fmt::Debug for ImageKitCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageKitCredentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("url_endpoint", &self.url_endpoint)
            .finish()
    }
}

/// ImageKit upload response (subset)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    url: Option<String>,
    file_id: Option<String>,
    name: Option<String>,
    file_path: Option<String>,
}

/// ImageKit media store client
pub struct ImageKitStore {
    http_client: reqwest::Client,
    credentials: ImageKitCredentials,
    folder: String,
    upload_url: String,
    api_base_url: String,
}

impl ImageKitStore {
    pub fn new(
        credentials: ImageKitCredentials,
        folder: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            folder: folder.into(),
            upload_url: IMAGEKIT_UPLOAD_URL.to_string(),
            api_base_url: IMAGEKIT_API_BASE_URL.to_string(),
        })
    }

    /// Point the client at different upload and management endpoints
    pub fn with_endpoints(mut self, upload_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Build the public URL from `filePath` when the response omits `url`
    fn url_from_file_path(&self, file_path: &str) -> String {
        format!(
            "{}/{}",
            self.credentials.url_endpoint.trim_end_matches('/'),
            file_path.trim_start_matches('/')
        )
    }

    async fn error_from_response(response: reqwest::Response) -> StorageError {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return StorageError::InvalidCredentials;
        }
        let error_text = response.text().await.unwrap_or_default();
        StorageError::ApiError(status.as_u16(), error_text)
    }
}

#[async_trait]
impl MediaStore for ImageKitStore {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<StoredMedia, StorageError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let form = Form::new()
            .part("file", Part::stream_with_length(body, length).file_name(file_name.to_string()))
            .text("fileName", file_name.to_string())
            .text("folder", self.folder.clone());

        tracing::debug!(
            file_name = %file_name,
            folder = %self.folder,
            bytes = length,
            "Uploading file to media store"
        );

        let response = self
            .http_client
            .post(&self.upload_url)
            .basic_auth(&self.credentials.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::ParseError(e.to_string()))?;

        let url = match (uploaded.url, uploaded.file_path.as_deref()) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(file_path)) => self.url_from_file_path(file_path),
            _ => {
                return Err(StorageError::ParseError(
                    "upload response has neither url nor filePath".to_string(),
                ))
            }
        };

        tracing::info!(
            file_name = %file_name,
            file_id = ?uploaded.file_id,
            url = %url,
            "Media upload successful"
        );

        Ok(StoredMedia {
            url,
            file_id: uploaded.file_id,
            name: uploaded.name.unwrap_or_else(|| file_name.to_string()),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        let url = format!("{}/files/{}", self.api_base_url.trim_end_matches('/'), file_id);

        let response = self
            .http_client
            .delete(&url)
            .basic_auth(&self.credentials.private_key, Some(""))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        tracing::info!(file_id = %file_id, "Deleted media object");
        Ok(())
    }
}
