//! Object-store uploaders
//!
//! An uploader receives the formatted stream as an [`AsyncRead`] and
//! transmits it under a bucket and key. The stream may suspend mid-read for
//! as long as the producer needs, and its length is never known up front.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::UploadError;

pub mod fs;
pub mod http;

pub use fs::FsUploader;
pub use http::HttpUploader;

/// Readable stream handed to an uploader
pub type UploadBody = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Destination for exported streams
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Transmit `body` to completion
    ///
    /// # Arguments
    /// * `bucket` - Destination bucket
    /// * `key` - Destination key within the bucket
    /// * `body` - Stream to transmit; read until end-of-stream or error
    ///
    /// # Returns
    /// * `Result<u64, UploadError>` - Number of bytes transmitted
    async fn upload(&self, bucket: &str, key: &str, body: UploadBody) -> Result<u64, UploadError>;
}

/// Reject keys that could escape their bucket.
pub(crate) fn validate_key(bucket: &str, key: &str) -> Result<(), UploadError> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        return Err(UploadError::InvalidDestination(format!(
            "bucket name '{bucket}' is not valid"
        )));
    }
    if key.is_empty()
        || key.starts_with('/')
        || key.split(['/', '\\']).any(|segment| segment == "..")
    {
        return Err(UploadError::InvalidDestination(format!(
            "key '{key}' is not valid"
        )));
    }
    Ok(())
}
