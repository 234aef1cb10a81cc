//! Row source over text-protocol query results
//!
//! Server databases hand back prepared-statement results in binary
//! encodings. Statements run through [`sqlx::raw_sql`] use the text
//! protocol instead, so every value arrives in the textual form the
//! formatters parse. This source works for any sqlx row type that can
//! decode a column as `&str`.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::ColumnIndex;
use tracing::debug;

use crate::error::{ScanError, SourceError};

use super::{ColumnDescriptor, Row, RowSource};

/// Row source reading every value as text
pub struct TextRowSource<'a, R> {
    columns: Vec<ColumnDescriptor>,
    rows: BoxStream<'a, Result<R, sqlx::Error>>,
    current: Option<R>,
    failure: Option<sqlx::Error>,
    fetched: u64,
}

impl<'a, R> TextRowSource<'a, R> {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: BoxStream<'a, Result<R, sqlx::Error>>) -> Self {
        Self {
            columns,
            rows,
            current: None,
            failure: None,
            fetched: 0,
        }
    }
}

#[async_trait]
impl<R> RowSource for TextRowSource<'_, R>
where
    R: sqlx::Row + Send,
    usize: ColumnIndex<R>,
    for<'r> &'r str: sqlx::Decode<'r, R::Database>,
{
    fn columns(&self) -> Result<Vec<ColumnDescriptor>, SourceError> {
        Ok(self.columns.clone())
    }

    async fn advance(&mut self) -> bool {
        self.current = None;
        match self.rows.next().await {
            Some(Ok(row)) => {
                self.fetched += 1;
                self.current = Some(row);
                true
            }
            Some(Err(e)) => {
                debug!("Query stream failed after {} rows: {}", self.fetched, e);
                self.failure = Some(e);
                false
            }
            None => {
                debug!("Query stream exhausted after {} rows", self.fetched);
                false
            }
        }
    }

    fn read_row(&mut self) -> Result<Row, ScanError> {
        let row = self.current.take().ok_or(ScanError::NotPositioned)?;

        (0..row.len())
            .map(|index| {
                row.try_get_unchecked::<Option<&str>, _>(index)
                    .map(|value| value.map(|text| text.as_bytes().to_vec()))
                    .map_err(|e| ScanError::Column {
                        index,
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    fn terminal_error(&mut self) -> Option<SourceError> {
        self.failure.take().map(SourceError::Sqlx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE readings (id INTEGER, label TEXT, value REAL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO readings VALUES (1, 'first', 12.5), (2, NULL, 100)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_values_read_as_text() {
        let pool = pool().await;
        let columns = vec![
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("label", "TEXT"),
        ];
        let rows = sqlx::raw_sql("SELECT id, label FROM readings ORDER BY id").fetch(&pool);
        let mut source = TextRowSource::new(columns.clone(), rows);

        assert_eq!(source.columns().unwrap(), columns);
        assert!(source.advance().await);
        assert_eq!(
            source.read_row().unwrap(),
            vec![Some(b"1".to_vec()), Some(b"first".to_vec())]
        );
        assert!(source.advance().await);
        assert_eq!(source.read_row().unwrap(), vec![Some(b"2".to_vec()), None]);
        assert!(!source.advance().await);
        assert!(source.terminal_error().is_none());
    }

    #[tokio::test]
    async fn test_read_without_advance() {
        let pool = pool().await;
        let rows = sqlx::raw_sql("SELECT id FROM readings").fetch(&pool);
        let mut source = TextRowSource::new(vec![ColumnDescriptor::new("id", "INTEGER")], rows);

        assert!(matches!(source.read_row(), Err(ScanError::NotPositioned)));
    }

    #[tokio::test]
    async fn test_stream_failure_is_terminal_error() {
        let pool = pool().await;
        let rows = sqlx::raw_sql("SELECT * FROM missing_table").fetch(&pool);
        let mut source = TextRowSource::new(Vec::new(), rows);

        assert!(!source.advance().await);
        assert!(matches!(source.terminal_error(), Some(SourceError::Sqlx(_))));
    }
}
