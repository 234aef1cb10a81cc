//! PostgreSQL query executor
//!
//! The statement is described first so column metadata is known before any
//! row is fetched; rows are then streamed over the simple-query protocol,
//! which returns every value in its text form.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Column, Executor, Statement, TypeInfo};
use tracing::debug;

use crate::error::SourceError;

use super::text::TextRowSource;
use super::{ColumnDescriptor, QueryExecutor, RowSource};

/// Query executor backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool for the given database URL
    ///
    /// # Arguments
    /// * `url` - PostgreSQL URL, e.g. `postgres://user@localhost/shop`
    /// * `max_connections` - Upper bound on pooled connections
    ///
    /// # Returns
    /// * `Result<Self, sqlx::Error>` - Connected executor or driver error
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        debug!("Opened PostgreSQL pool");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn query<'a>(&'a self, sql: &'a str) -> Result<Box<dyn RowSource + 'a>, SourceError> {
        let statement = (&self.pool)
            .prepare(sql)
            .await
            .map_err(|e| SourceError::Query(e.to_string()))?;
        let columns: Vec<ColumnDescriptor> = statement
            .columns()
            .iter()
            .map(|column| ColumnDescriptor::new(column.name(), column.type_info().name()))
            .collect();
        debug!("Described statement with {} columns", columns.len());

        let rows = sqlx::raw_sql(sql).fetch(&self.pool);
        Ok(Box::new(TextRowSource::new(columns, rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identifiers_are_double_quoted() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/chiv")
            .unwrap();
        let executor = PostgresExecutor::new(pool);

        assert_eq!(executor.quote_identifier("orders"), r#""orders""#);
        assert_eq!(executor.quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }
}
