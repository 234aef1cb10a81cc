//! HTTP uploader
//!
//! Streams the body to `PUT {endpoint}/{bucket}/{key}` with chunked transfer
//! encoding, which is what S3-compatible gateways and plain object servers
//! accept when the length is not known in advance.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Body, Client, Url};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::UploadError;

use super::{UploadBody, Uploader, validate_key};

/// Largest part of an error response kept in [`UploadError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Uploader that PUTs objects to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    endpoint: Url,
}

impl HttpUploader {
    /// Create a new HTTP uploader
    ///
    /// # Arguments
    /// * `endpoint` - Base URL; bucket and key are appended as path segments
    /// * `connect_timeout` - Timeout for establishing connections
    ///
    /// # Returns
    /// * `Result<Self, UploadError>` - Uploader, or an error if the endpoint
    ///   is not a URL or the client cannot be built
    pub fn new(endpoint: &str, connect_timeout: Duration) -> Result<Self, UploadError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            UploadError::InvalidDestination(format!("endpoint '{endpoint}' is not a URL: {e}"))
        })?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create an uploader around an existing client
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// URL an object is stored at
    ///
    /// The bucket and every `/`-separated part of the key become their own
    /// percent-encoded path segment, so `#` or `?` in a key stay part of the
    /// object name.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, UploadError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                UploadError::InvalidDestination(format!(
                    "endpoint '{}' cannot carry a path",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, bucket: &str, key: &str, body: UploadBody) -> Result<u64, UploadError> {
        validate_key(bucket, key)?;

        let url = self.object_url(bucket, key)?;
        let sent = Arc::new(AtomicU64::new(0));
        let counter = sent.clone();
        let stream = ReaderStream::new(body).inspect_ok(move |chunk| {
            counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        });

        debug!("Uploading to {}", url);
        let response = self
            .client
            .put(url.clone())
            .body(Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let sent = sent.load(Ordering::Relaxed);
        debug!("Uploaded {} bytes to {} ({})", sent, url, status);
        Ok(sent)
    }
}
