//! JSON formatter for export operations
//!
//! Writes a single top-level array with one object per record, keyed by
//! column name in column order. The array is streamed: the opening bracket
//! goes out on open, each object as it is formatted, and the closing bracket
//! on close.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::FormatError;
use crate::source::ColumnDescriptor;

use super::RecordFormatter;
use super::scalar::TypedColumns;

const OPEN_BRACKET: &[u8] = b"[";
const CLOSE_BRACKET: &[u8] = b"]";
const COMMA: &[u8] = b",";

/// Formatter for a JSON array of objects
pub struct JsonFormatter<W> {
    writer: W,
    columns: TypedColumns,
    opened: bool,
    closed: bool,
    written: u64,
}

impl<W> JsonFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new JSON formatter
    ///
    /// # Arguments
    /// * `writer` - Sink the JSON text is written to
    /// * `columns` - Columns of the exported result
    pub fn new(writer: W, columns: &[ColumnDescriptor]) -> Self {
        Self {
            writer,
            columns: TypedColumns::new(columns),
            opened: false,
            closed: false,
            written: 0,
        }
    }
}

#[async_trait]
impl<W> RecordFormatter for JsonFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn open(&mut self) -> Result<(), FormatError> {
        if !self.opened {
            self.writer.write_all(OPEN_BRACKET).await?;
            self.opened = true;
        }
        Ok(())
    }

    async fn format(&mut self, record: &[Option<Vec<u8>>]) -> Result<(), FormatError> {
        let encoded = {
            let record = self.columns.record(record)?;
            serde_json::to_vec(&record).map_err(std::io::Error::from)?
        };

        if self.written > 0 {
            self.writer.write_all(COMMA).await?;
        }
        self.writer.write_all(&encoded).await?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        if self.closed {
            return Ok(());
        }
        // An array that was never opened still has to come out as `[]`.
        self.open().await?;
        self.writer.write_all(CLOSE_BRACKET).await?;
        self.writer.shutdown().await?;
        self.closed = true;

        debug!("Finalized JSON output ({} records)", self.written);
        Ok(())
    }

    fn extension(&self) -> Option<&'static str> {
        Some("json")
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}
