//! Binary upload collaborator: trait seam plus the bucket-storage HTTP
//! client. An upload pushes the staged bytes and hands back the stable
//! retrieval URL the image record will carry.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{info, warn};

use crate::model::StagedFile;

#[async_trait]
pub trait BlobUploader: Send + Sync {
    /// Upload one staged file, returning its public retrieval URL.
    async fn upload(&self, file: &StagedFile) -> Result<String>;
}

#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    endpoint: Url,
    token: String,
    bucket: String,
}

impl fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageClient")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    pub fn new(endpoint: Url, token: String, bucket: String) -> Self {
        let http = Client::builder()
            .user_agent("listing-curator/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            token,
            bucket,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Result<Self> {
        let endpoint = Url::parse(&cfg.storage.endpoint).context("invalid storage.endpoint")?;
        Ok(Self::new(
            endpoint,
            cfg.storage.token.clone(),
            cfg.storage.bucket.clone(),
        ))
    }

    fn upload_url(&self, file_name: &str) -> Result<Url> {
        self.endpoint
            .join(&format!("object/{}/{}", self.bucket, file_name))
            .context("invalid storage upload URL")
    }
}

#[async_trait]
impl BlobUploader for StorageClient {
    async fn upload(&self, file: &StagedFile) -> Result<String> {
        let url = self.upload_url(&file.file_name)?;
        let content_type = content_type_for(&file.file_name);

        info!(file=%file.file_name, bytes = file.bytes.len(), "uploading image binary");

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .multipart(form)
            .send()
            .await
            .context("failed to reach blob storage")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(file=%file.file_name, "upload failed {}: {}", status, body);
            return Err(anyhow!("upload failed {}: {}", status, body));
        }

        let payload: UploadResponse = res
            .json()
            .await
            .context("invalid blob storage response JSON")?;
        info!(file=%file.file_name, url=%payload.url, "upload complete");
        Ok(payload.url)
    }
}

/// Content type inferred from the file extension. Matches the formats the
/// staging UI accepts, with a binary fallback.
pub fn content_type_for(file_name: &str) -> &'static str {
    match std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}
