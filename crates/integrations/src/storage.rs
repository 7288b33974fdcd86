//! Object storage backends for generated files

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};
use url::Url;
use urbanova_core::ports::ObjectStorage;
use urbanova_core::{ConciergeError, ConciergeResult};

/// Public URL of `bucket/key` below `base`
fn public_url(base: &str, bucket: &str, key: &str) -> ConciergeResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| ConciergeError::Storage(format!("Invalid public base url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ConciergeError::Storage(format!("Public base url cannot be a base: {base}")))?
        .pop_if_empty()
        .push(bucket)
        .extend(key.split('/'));
    Ok(url.to_string())
}

/// Reject keys that would escape the bucket
fn check_key(key: &str) -> ConciergeResult<()> {
    let path = Path::new(key);
    if key.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ConciergeError::validation(format!("invalid object key: {key}")));
    }
    Ok(())
}

/// Google Cloud Storage, JSON API media upload
pub struct GcsStorage {
    client: Client,
    base_url: String,
    access_token: String,
    public_base_url: String,
}

impl GcsStorage {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for GcsStorage {
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ConciergeResult<String> {
        check_key(key)?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(bucket)
        );

        let res = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                error!("GCS connection error: {}", e);
                ConciergeError::external("gcs", e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            error!(%status, bucket, key, "GCS upload failed: {}", text);
            return Err(ConciergeError::external("gcs", format!("status {status}: {text}")));
        }

        debug!(bucket, key, "Object uploaded");
        public_url(&self.public_base_url, bucket, key)
    }
}

/// Local directory, one sub-directory per bucket
pub struct FilesystemStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn path_of(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStorage for FilesystemStorage {
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> ConciergeResult<String> {
        check_key(bucket)?;
        check_key(key)?;
        let path = self.path_of(bucket, key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConciergeError::Storage(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ConciergeError::Storage(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), "Object written");
        public_url(&self.public_base_url, bucket, key)
    }
}
