//! Download half of the export pipeline
//!
//! Drains a [`RowSource`] row by row, feeds every row to the selected
//! formatter and writes the encoded bytes into the transport. Only one row is
//! held in memory at a time; back-pressure comes from the transport, which
//! blocks writes until the upload side has consumed the previous chunk.

use tokio::io::BufWriter;
use tracing::{debug, info};

use crate::error::{ExportError, ExportErrorKind, FormatError, Stage};
use crate::source::{ColumnDescriptor, Row, RowSource};

use super::formatters::RecordFormatter;
use super::options::ExportOptions;
use super::progress::ProgressTracker;
use super::transport::TransportWriter;

/// Size of the chunks handed to the transport.
const CHUNK_SIZE: usize = 64 * 1024;

/// Rows between progress log lines.
const LOG_INTERVAL: u64 = 10_000;

fn formatting(err: FormatError) -> ExportError {
    ExportError::new(Stage::Formatting, err.into())
}

/// Build the formatter selected by `options` over the producer half of the transport
///
/// Writes are buffered into chunks of [`CHUNK_SIZE`] bytes before they reach
/// the transport.
pub fn transport_formatter(
    options: &ExportOptions,
    columns: &[ColumnDescriptor],
    writer: TransportWriter,
) -> Box<dyn RecordFormatter> {
    let sink = BufWriter::with_capacity(CHUNK_SIZE, writer);
    options.format.formatter(sink, columns)
}

/// Stream every row of `source` through `formatter`
///
/// The formatter's sink is shut down cleanly only when the formatter has
/// been closed; on any error the formatter is dropped together with its
/// sink, which aborts the stream for the upload side.
///
/// # Arguments
/// * `source` - Row source positioned before its first row
/// * `formatter` - Formatter owning the producer half of the transport
/// * `null` - Sentinel written in place of absent values
/// * `progress` - Optional progress tracker
///
/// # Returns
/// * `Result<u64, ExportError>` - Number of records, or the first error,
///   tagged with its stage
pub async fn download(
    source: &mut (dyn RowSource + '_),
    mut formatter: Box<dyn RecordFormatter + '_>,
    null: Option<&[u8]>,
    progress: Option<&ProgressTracker>,
) -> Result<u64, ExportError> {
    let records = drain(source, formatter.as_mut(), null, progress).await?;

    info!("Download finished: {} records", records);
    Ok(records)
}

async fn drain(
    source: &mut (dyn RowSource + '_),
    formatter: &mut (dyn RecordFormatter + '_),
    null: Option<&[u8]>,
    progress: Option<&ProgressTracker>,
) -> Result<u64, ExportError> {
    formatter.open().await.map_err(formatting)?;

    let mut records = 0u64;
    while source.advance().await {
        let mut row = source
            .read_row()
            .map_err(|e| ExportError::new(Stage::Downloading, ExportErrorKind::Scan(e)))?;
        if let Some(sentinel) = null {
            substitute_null(&mut row, sentinel);
        }

        formatter.format(&row).await.map_err(formatting)?;
        records += 1;

        if let Some(tracker) = progress {
            tracker.update(records);
        }
        if records % LOG_INTERVAL == 0 {
            debug!("Progress: {} records formatted", records);
        }
    }

    if let Some(err) = source.terminal_error() {
        return Err(ExportError::new(
            Stage::Downloading,
            ExportErrorKind::Source(err),
        ));
    }

    formatter.close().await.map_err(formatting)?;
    debug!("Row source exhausted after {} records", records);
    Ok(records)
}

/// Replace every absent value with the sentinel bytes.
fn substitute_null(row: &mut Row, sentinel: &[u8]) {
    for value in row.iter_mut().filter(|v| v.is_none()) {
        *value = Some(sentinel.to_vec());
    }
}
