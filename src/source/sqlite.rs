//! SQLite query executor
//!
//! Streams query results from a SQLite database through `sqlx`. The statement
//! is prepared first so column metadata is known before any row is fetched,
//! which lets an empty table still produce a header.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::sqlite::{SqliteColumn, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as _, Statement, TypeInfo};
use tracing::debug;

use crate::error::{ScanError, SourceError};

use super::{ColumnDescriptor, QueryExecutor, Row, RowSource, ScalarKind};

/// Query executor backed by a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Wrap an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for the given database URL
    ///
    /// # Arguments
    /// * `url` - SQLite URL, e.g. `sqlite://archive.db` or `sqlite::memory:`
    /// * `max_connections` - Upper bound on pooled connections
    ///
    /// # Returns
    /// * `Result<Self, sqlx::Error>` - Connected executor or driver error
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        debug!("Opened SQLite pool for {}", url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn query<'a>(&'a self, sql: &'a str) -> Result<Box<dyn RowSource + 'a>, SourceError> {
        let statement = (&self.pool)
            .prepare(sql)
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        let columns: Vec<ColumnDescriptor> = statement.columns().iter().map(describe).collect();
        debug!("Prepared statement with {} columns", columns.len());

        let rows = sqlx::query(sql).fetch(&self.pool);
        Ok(Box::new(SqliteRowSource::new(columns, rows)))
    }
}

/// Map SQLite storage types onto scan types; anything else is classified by name.
fn describe(column: &SqliteColumn) -> ColumnDescriptor {
    let type_name = column.type_info().name();
    let descriptor = ColumnDescriptor::new(column.name(), type_name);

    match type_name {
        "BOOLEAN" => descriptor.with_scan_type(ScalarKind::Boolean),
        "INTEGER" => descriptor.with_scan_type(ScalarKind::Integer),
        "REAL" => descriptor.with_scan_type(ScalarKind::Float),
        "TEXT" => descriptor.with_scan_type(ScalarKind::Text),
        _ => descriptor,
    }
}

/// Row source over a streaming SQLite query
pub struct SqliteRowSource<'a> {
    columns: Vec<ColumnDescriptor>,
    rows: BoxStream<'a, Result<SqliteRow, sqlx::Error>>,
    current: Option<SqliteRow>,
    failure: Option<sqlx::Error>,
    fetched: u64,
}

impl<'a> SqliteRowSource<'a> {
    pub fn new(
        columns: Vec<ColumnDescriptor>,
        rows: BoxStream<'a, Result<SqliteRow, sqlx::Error>>,
    ) -> Self {
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
impl RowSource for SqliteRowSource<'_> {
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
                debug!("SQLite stream failed after {} rows: {}", self.fetched, e);
                self.failure = Some(e);
                false
            }
            None => {
                debug!("SQLite stream exhausted after {} rows", self.fetched);
                false
            }
        }
    }

    fn read_row(&mut self) -> Result<Row, ScanError> {
        let row = self.current.take().ok_or(ScanError::NotPositioned)?;

        // SQLite hands back the text form of numeric values when read as bytes.
        (0..row.len())
            .map(|index| {
                row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
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

    async fn executor() -> SqliteExecutor {
        let executor = SqliteExecutor::connect("sqlite::memory:", 1).await.unwrap();
        sqlx::query(
            "CREATE TABLE readings (id INTEGER, label TEXT, value REAL, active BOOLEAN)",
        )
        .execute(executor.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO readings VALUES (1, 'first', 100, 1), (2, NULL, 12.5, 0)",
        )
        .execute(executor.pool())
        .await
        .unwrap();
        executor
    }

    #[tokio::test]
    async fn test_columns_from_prepared_statement() {
        let executor = executor().await;
        let source = executor.query("SELECT * FROM readings").await.unwrap();
        let columns = source.columns().unwrap();

        let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "label", "value", "active"]);
        assert_eq!(columns[0].scalar_kind(), ScalarKind::Integer);
        assert_eq!(columns[1].scalar_kind(), ScalarKind::Text);
        assert_eq!(columns[2].scalar_kind(), ScalarKind::Float);
    }

    #[tokio::test]
    async fn test_rows_read_as_raw_bytes() {
        let executor = executor().await;
        let mut source = executor
            .query("SELECT id, label FROM readings ORDER BY id")
            .await
            .unwrap();

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
    async fn test_invalid_query() {
        let executor = executor().await;
        let result = executor.query("SELECT * FROM missing_table").await;
        assert!(matches!(result, Err(SourceError::Query(_))));
    }
}
