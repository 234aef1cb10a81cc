//! Export coordinator
//!
//! The [`Archiver`] owns the export configuration and wires a row source, a
//! formatter, the transport and an uploader together for every export. Each
//! export runs exactly two concurrent tasks in one async scope: the download
//! task drains rows into the transport and the upload task streams the
//! transport to the object store.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExportError, ExportErrorKind, Stage, UploadError};
use crate::source::{QueryExecutor, RowSource};
use crate::upload::Uploader;

use super::options::{ExportOption, ExportOptions};
use super::progress::ProgressTracker;
use super::streaming::{download, transport_formatter};
use super::transport::pipe;

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Key the object was stored under
    pub key: String,
    /// Number of records exported
    pub records: u64,
    /// Number of bytes accepted by the uploader
    pub bytes: u64,
}

/// Streams query results to an object store
#[derive(Clone)]
pub struct Archiver {
    /// Issues the selection statements
    executor: Arc<dyn QueryExecutor>,
    /// Receives the formatted streams
    uploader: Arc<dyn Uploader>,
    /// Configuration every export starts from
    options: ExportOptions,
    /// Whether to draw a progress spinner
    show_progress: bool,
}

impl Archiver {
    /// Create an archiver with the default configuration (CSV, no key)
    pub fn new(executor: Arc<dyn QueryExecutor>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            executor,
            uploader,
            options: ExportOptions::default(),
            show_progress: false,
        }
    }

    /// Return a new archiver with `options` applied to its base configuration
    ///
    /// # Arguments
    /// * `options` - Setters applied in order on top of the current base
    ///
    /// # Returns
    /// * `Archiver` - New snapshot; `self` keeps its configuration
    pub fn configure(&self, options: &[ExportOption]) -> Archiver {
        Archiver {
            options: self.options.apply(options),
            ..self.clone()
        }
    }

    /// Enable or disable the progress spinner
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Base configuration of this archiver
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export a table
    ///
    /// # Arguments
    /// * `table` - Table to select from
    /// * `bucket` - Destination bucket
    /// * `options` - Per-call overrides of the base configuration
    ///
    /// # Returns
    /// * `Result<ExportSummary, ExportError>` - Summary, or the first error
    pub async fn export(
        &self,
        table: &str,
        bucket: &str,
        options: &[ExportOption],
    ) -> Result<ExportSummary, ExportError> {
        self.export_with_cancellation(table, bucket, options, CancellationToken::new())
            .await
    }

    /// Export a table, aborting when `token` is cancelled
    pub async fn export_with_cancellation(
        &self,
        table: &str,
        bucket: &str,
        options: &[ExportOption],
        token: CancellationToken,
    ) -> Result<ExportSummary, ExportError> {
        let options = self.options.apply(options);
        let sql = options.select_statement(table, |name| self.executor.quote_identifier(name));

        info!("Exporting table '{}' to bucket '{}'", table, bucket);
        debug!("Querying: {}", sql);

        let mut source = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Export of '{}' cancelled before the query completed", table);
                return Err(ExportError::cancelled(Stage::Querying));
            }
            result = self.executor.query(&sql) => result.map_err(|e| {
                warn!("Query for '{}' failed: {}", table, e);
                ExportError::new(Stage::Querying, ExportErrorKind::Source(e))
            })?,
        };

        self.run(source.as_mut(), Some(table), bucket, &options, token)
            .await
    }

    /// Export the rows of a caller-supplied source
    ///
    /// There is no table name to derive a key from, so an explicit key must
    /// be configured.
    pub async fn export_rows(
        &self,
        source: &mut (dyn RowSource + '_),
        bucket: &str,
        options: &[ExportOption],
    ) -> Result<ExportSummary, ExportError> {
        self.export_rows_with_cancellation(source, bucket, options, CancellationToken::new())
            .await
    }

    /// Export the rows of a caller-supplied source, aborting when `token` is cancelled
    pub async fn export_rows_with_cancellation(
        &self,
        source: &mut (dyn RowSource + '_),
        bucket: &str,
        options: &[ExportOption],
        token: CancellationToken,
    ) -> Result<ExportSummary, ExportError> {
        let options = self.options.apply(options);
        self.run(source, None, bucket, &options, token).await
    }

    async fn run(
        &self,
        source: &mut (dyn RowSource + '_),
        table: Option<&str>,
        bucket: &str,
        options: &ExportOptions,
        token: CancellationToken,
    ) -> Result<ExportSummary, ExportError> {
        let start_time = Instant::now();

        let columns = source
            .columns()
            .map_err(|e| ExportError::new(Stage::Querying, ExportErrorKind::Source(e)))?;
        debug!("Result has {} columns", columns.len());

        let (writer, reader) = pipe();
        let formatter = transport_formatter(options, &columns, writer);

        let key = options
            .resolve_key(table, formatter.extension())
            .ok_or_else(|| {
                ExportError::new(
                    Stage::Querying,
                    ExportErrorKind::Configuration(
                        "an explicit key is required when exporting rows without a table name"
                            .to_string(),
                    ),
                )
            })?;

        let tracker = self
            .show_progress
            .then(|| ProgressTracker::new(&format!("{bucket}/{key}"), true));

        let download_task = download(source, formatter, options.null.as_deref(), tracker.as_ref());
        let upload_task = self.uploader.upload(bucket, &key, Box::new(reader));
        let pipeline = async { tokio::join!(download_task, upload_task) };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ExportError::cancelled(Stage::Uploading)),
            (downloaded, uploaded) = pipeline => settle(downloaded, uploaded),
        };

        if let Some(ref tracker) = tracker {
            tracker.finish();
        }

        match outcome {
            Ok((records, bytes)) => {
                info!(
                    "Export completed: {} records, {} bytes to {}/{} in {} ms",
                    records,
                    bytes,
                    bucket,
                    key,
                    start_time.elapsed().as_millis()
                );
                Ok(ExportSummary {
                    key,
                    records,
                    bytes,
                })
            }
            Err(e) if e.is_cancelled() => {
                info!("Export to {}/{} cancelled", bucket, key);
                Err(e)
            }
            Err(e) => {
                warn!("Export to {}/{} failed: {}", bucket, key, e);
                Err(e)
            }
        }
    }
}

/// Pick the error that caused the export to fail.
///
/// A failing side closes its end of the transport, so the other side usually
/// fails too with a broken stream. That secondary failure is never reported
/// when the root cause is known.
fn settle(
    downloaded: Result<u64, ExportError>,
    uploaded: Result<u64, UploadError>,
) -> Result<(u64, u64), ExportError> {
    let upload_error = |e: UploadError| ExportError::new(Stage::Uploading, ExportErrorKind::Upload(e));

    match (downloaded, uploaded) {
        (Ok(records), Ok(bytes)) => Ok((records, bytes)),
        (Err(e), _) if !matches!(e.kind(), ExportErrorKind::Transport(_)) => Err(e),
        (_, Err(e)) => Err(upload_error(e)),
        (Err(e), Ok(_)) => Err(e),
    }
}
