//! YAML formatter for export operations
//!
//! Each record is written as its own single-item block sequence, so the
//! fragments concatenate into one YAML list without any framing.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::FormatError;
use crate::source::ColumnDescriptor;

use super::RecordFormatter;
use super::scalar::TypedColumns;

/// Formatter for a YAML sequence of mappings
pub struct YamlFormatter<W> {
    writer: W,
    columns: TypedColumns,
    written: u64,
}

impl<W> YamlFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, columns: &[ColumnDescriptor]) -> Self {
        Self {
            writer,
            columns: TypedColumns::new(columns),
            written: 0,
        }
    }
}

#[async_trait]
impl<W> RecordFormatter for YamlFormatter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn open(&mut self) -> Result<(), FormatError> {
        Ok(())
    }

    async fn format(&mut self, record: &[Option<Vec<u8>>]) -> Result<(), FormatError> {
        let fragment = {
            let record = self.columns.record(record)?;
            serde_yaml::to_string(&[record]).map_err(std::io::Error::other)?
        };

        self.writer.write_all(fragment.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        self.writer.shutdown().await?;
        debug!("Finalized YAML output ({} records)", self.written);
        Ok(())
    }

    fn extension(&self) -> Option<&'static str> {
        Some("yaml")
    }

    fn records_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_yaml_formatter_empty() {
        let columns = vec![ColumnDescriptor::new("id", "INTEGER")];
        let mut out = Vec::new();
        let mut formatter = YamlFormatter::new(&mut out, &columns);

        formatter.open().await.unwrap();
        formatter.close().await.unwrap();
        drop(formatter);

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_yaml_fragments_form_one_list() {
        let columns = vec![
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
        ];
        let mut out = Vec::new();
        let mut formatter = YamlFormatter::new(&mut out, &columns);

        formatter.open().await.unwrap();
        formatter
            .format(&[Some(b"1".to_vec()), Some(b"first".to_vec())])
            .await
            .unwrap();
        formatter
            .format(&[Some(b"2".to_vec()), None])
            .await
            .unwrap();
        formatter.close().await.unwrap();
        drop(formatter);

        let parsed: Vec<serde_yaml::Mapping> =
            serde_yaml::from_slice(&out).expect("output should be one YAML list");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["id"], serde_yaml::Value::from(1));
        assert_eq!(parsed[0]["name"], serde_yaml::Value::from("first"));
        assert_eq!(parsed[1]["name"], serde_yaml::Value::Null);
    }
}
