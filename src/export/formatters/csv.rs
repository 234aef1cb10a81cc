//! CSV formatter for export operations
//!
//! Writes a header row of column names followed by one line per record.
//! Values are emitted as raw text; a field is quoted only when it would
//! otherwise be ambiguous.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::FormatError;
use crate::source::ColumnDescriptor;

use super::RecordFormatter;
use super::scalar::check_length;

/// Formatter for comma-separated values
pub struct CsvFormatter<W> {
    /// Output sink
    writer: W,
    /// Column headers (field names)
    headers: Vec<String>,
    /// Reusable line buffer
    line: Vec<u8>,
    /// Number of records written
    written: u64,
}

impl<W> CsvFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new CSV formatter
    ///
    /// # Arguments
    /// * `writer` - Sink the CSV text is written to
    /// * `columns` - Columns of the exported result
    pub fn new(writer: W, columns: &[ColumnDescriptor]) -> Self {
        Self {
            writer,
            headers: columns.iter().map(|c| c.name().to_string()).collect(),
            line: Vec::new(),
            written: 0,
        }
    }

    async fn write_line<'a, I>(&mut self, fields: I) -> Result<(), FormatError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        self.line.clear();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.line.push(b',');
            }
            escape_csv_value(field, &mut self.line);
        }
        self.line.push(b'\n');

        self.writer.write_all(&self.line).await?;
        Ok(())
    }
}

/// Append a CSV field, quoting it if necessary
///
/// Fields containing a comma, quote, CR or LF, fields starting with
/// whitespace, and the PostgreSQL end-of-data marker `\.` are wrapped in
/// quotes with internal quotes doubled.
fn escape_csv_value(value: &[u8], out: &mut Vec<u8>) {
    let needs_quotes = value == b"\\."
        || value.first().is_some_and(|b| b" \t\x0b\x0c".contains(b))
        || value
            .iter()
            .any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r'));

    if !needs_quotes {
        out.extend_from_slice(value);
        return;
    }

    out.push(b'"');
    for &b in value {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

#[async_trait]
impl<W> RecordFormatter for CsvFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn open(&mut self) -> Result<(), FormatError> {
        let headers = std::mem::take(&mut self.headers);
        let result = self
            .write_line(headers.iter().map(|h| h.as_bytes()))
            .await;
        self.headers = headers;
        result?;

        debug!("Wrote CSV headers: {} fields", self.headers.len());
        Ok(())
    }

    async fn format(&mut self, record: &[Option<Vec<u8>>]) -> Result<(), FormatError> {
        check_length(self.headers.len(), record.len())?;

        self.write_line(record.iter().map(|v| v.as_deref().unwrap_or_default()))
            .await?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        self.writer.shutdown().await?;
        debug!("Finalized CSV output ({} records)", self.written);
        Ok(())
    }

    fn extension(&self) -> Option<&'static str> {
        Some("csv")
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape(value: &str) -> String {
        let mut out = Vec::new();
        escape_csv_value(value.as_bytes(), &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_escape_value() {
        assert_eq!(escape("simple"), "simple");
        assert_eq!(escape(""), "");
        assert_eq!(escape("with,comma"), "\"with,comma\"");
        assert_eq!(escape("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape("with\nnewline"), "\"with\nnewline\"");
        assert_eq!(escape(" leading"), "\" leading\"");
        assert_eq!(escape("\\."), "\"\\.\"");
    }

    #[tokio::test]
    async fn test_csv_formatter_basic() {
        let columns = vec![
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
        ];
        let mut out = Vec::new();
        let mut formatter = CsvFormatter::new(&mut out, &columns);

        formatter.open().await.unwrap();
        formatter
            .format(&[Some(b"1".to_vec()), Some(b"Hello, world!".to_vec())])
            .await
            .unwrap();
        formatter
            .format(&[Some(b"2".to_vec()), None])
            .await
            .unwrap();
        formatter.close().await.unwrap();
        assert_eq!(formatter.records_written(), 2);
        drop(formatter);

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,name\n1,\"Hello, world!\"\n2,\n"
        );
    }

    #[tokio::test]
    async fn test_csv_formatter_write_error() {
        let columns = vec![ColumnDescriptor::new("id", "INTEGER")];
        let sink = tokio_test::io::Builder::new()
            .write(b"id\n")
            .write_error(std::io::Error::other("disk full"))
            .build();
        let mut formatter = CsvFormatter::new(sink, &columns);

        formatter.open().await.unwrap();
        let err = formatter.format(&[Some(b"1".to_vec())]).await.unwrap_err();
        assert!(matches!(err, FormatError::Write(ref e) if e.to_string() == "disk full"));
        assert_eq!(formatter.records_written(), 0);
    }

    #[tokio::test]
    async fn test_csv_formatter_record_length() {
        let columns = vec![ColumnDescriptor::new("id", "INTEGER")];
        let mut out = Vec::new();
        let mut formatter = CsvFormatter::new(&mut out, &columns);

        formatter.open().await.unwrap();
        let err = formatter
            .format(&[Some(b"1".to_vec()), Some(b"2".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::RecordLength {
                expected: 1,
                found: 2
            }
        ));
    }
}
