//! Filesystem uploader
//!
//! Stores objects under `root/bucket/key`. The object is written to a
//! temporary sibling first and renamed into place once the stream ended
//! cleanly, so a failed export never leaves a complete-looking file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::error::UploadError;

use super::{UploadBody, Uploader, validate_key};

/// Uploader that writes objects to a local directory tree
#[derive(Debug, Clone)]
pub struct FsUploader {
    root: PathBuf,
}

impl FsUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object is stored at
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl Uploader for FsUploader {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        mut body: UploadBody,
    ) -> Result<u64, UploadError> {
        validate_key(bucket, key)?;

        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let file = fs::File::create(&partial).await?;
        let mut file = BufWriter::new(file);

        let copied = match tokio::io::copy(&mut body, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    warn!("Failed to remove {}: {}", partial.display(), cleanup);
                }
                return Err(e.into());
            }
        };
        file.flush().await?;
        file.get_mut().sync_all().await?;
        drop(file);

        fs::rename(&partial, &path).await?;
        debug!("Stored {} bytes at {}", copied, path.display());
        Ok(copied)
    }
}
