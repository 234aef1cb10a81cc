//! Row sources for export operations
//!
//! This module defines the cursor-style interface the export pipeline reads
//! rows from, together with the column metadata every formatter relies on.
//!
//! Any row-producing component can drive an export: a live query
//! ([`SqliteRowSource`], [`TextRowSource`]), a replay of recorded rows
//! ([`MemoryRowSource`]) or a test double.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ScanError, SourceError};

pub mod memory;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod text;

pub use memory::MemoryRowSource;
pub use mysql::MySqlExecutor;
pub use postgres::PostgresExecutor;
pub use sqlite::{SqliteExecutor, SqliteRowSource};
pub use text::TextRowSource;

/// One row of raw scalar values, one entry per column.
///
/// `None` marks an absent (NULL) value.
pub type Row = Vec<Option<Vec<u8>>>;

/// Scalar category a column's raw bytes are parsed into by structured formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ScalarKind {
    /// Classify a database type name.
    ///
    /// Matching is case-insensitive and looks at every alphanumeric word of
    /// the type name, so `DECIMAL(10,2)`, `double precision`, `INT4` and
    /// `UNSIGNED BIGINT` are recognized.
    ///
    /// # Arguments
    /// * `type_name` - Type name as reported by the database driver
    ///
    /// # Returns
    /// * `Option<ScalarKind>` - Category, or None when the name is not recognized
    pub fn from_database_type(type_name: &str) -> Option<Self> {
        let upper = type_name.to_ascii_uppercase();
        let words: Vec<&str> = upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();

        if words.iter().any(|word| word.starts_with("BOOL")) {
            return Some(ScalarKind::Boolean);
        }

        if words.iter().any(|word| {
            ["DECIMAL", "FLOAT", "NUMERIC", "DOUBLE"]
                .iter()
                .any(|prefix| word.starts_with(prefix))
        }) {
            return Some(ScalarKind::Float);
        }

        if words.iter().any(|word| {
            (word.starts_with("INT") && !word.starts_with("INTERVAL"))
                || ["BIGINT", "SMALLINT", "TINYINT", "MEDIUMINT"]
                    .iter()
                    .any(|prefix| word.starts_with(prefix))
        }) {
            return Some(ScalarKind::Integer);
        }

        None
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Boolean => "boolean",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    database_type_name: String,
    native_scan_type: Option<ScalarKind>,
}

impl ColumnDescriptor {
    /// Create a descriptor without a native scan type
    pub fn new(name: impl Into<String>, database_type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_type_name: database_type_name.into(),
            native_scan_type: None,
        }
    }

    /// Attach the scan type the driver reports for this column.
    pub fn with_scan_type(mut self, kind: ScalarKind) -> Self {
        self.native_scan_type = Some(kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_type_name(&self) -> &str {
        &self.database_type_name
    }

    pub fn native_scan_type(&self) -> Option<ScalarKind> {
        self.native_scan_type
    }

    /// Resolve the scalar kind values of this column are parsed into.
    ///
    /// The native scan type wins; otherwise the database type name is
    /// classified; anything unrecognized is text.
    pub fn scalar_kind(&self) -> ScalarKind {
        self.native_scan_type
            .or_else(|| ScalarKind::from_database_type(&self.database_type_name))
            .unwrap_or(ScalarKind::Text)
    }
}

/// Cursor over the rows of a query result
///
/// The export pipeline calls [`advance`](RowSource::advance) before every
/// [`read_row`](RowSource::read_row) and checks
/// [`terminal_error`](RowSource::terminal_error) once `advance` returns false.
#[async_trait]
pub trait RowSource: Send {
    /// Column descriptors of the result, in select-list order
    fn columns(&self) -> Result<Vec<ColumnDescriptor>, SourceError>;

    /// Move to the next row
    ///
    /// # Returns
    /// * `bool` - True if a row is available, false at the end of iteration
    async fn advance(&mut self) -> bool;

    /// Raw values of the current row
    fn read_row(&mut self) -> Result<Row, ScanError>;

    /// Error that ended iteration, if it did not end by exhaustion
    fn terminal_error(&mut self) -> Option<SourceError>;
}

/// Issues SQL statements and hands back their rows as a [`RowSource`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query
    ///
    /// # Arguments
    /// * `sql` - Statement to execute
    ///
    /// # Returns
    /// * `Result<Box<dyn RowSource + 'a>, SourceError>` - Row source borrowing the executor and statement
    async fn query<'a>(&'a self, sql: &'a str) -> Result<Box<dyn RowSource + 'a>, SourceError>;

    /// Quote a table or column name for this executor's SQL dialect
    ///
    /// Defaults to ANSI double quotes with embedded quotes doubled.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Supported database drivers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Sqlite,
    Postgres,
    Mysql,
}

impl Driver {
    /// Infer the driver from the scheme of a database URL
    ///
    /// # Arguments
    /// * `url` - Connection URL, e.g. `postgres://localhost/shop`
    ///
    /// # Returns
    /// * `Option<Driver>` - Driver, or None for an unknown scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once(':')?;
        scheme.parse().ok()
    }

    /// Open a connection pool and wrap it in the matching executor
    ///
    /// # Arguments
    /// * `url` - Connection URL
    /// * `max_connections` - Upper bound on pooled connections
    ///
    /// # Returns
    /// * `Result<Arc<dyn QueryExecutor>, sqlx::Error>` - Connected executor or driver error
    pub async fn connect(
        self,
        url: &str,
        max_connections: u32,
    ) -> Result<Arc<dyn QueryExecutor>, sqlx::Error> {
        let executor: Arc<dyn QueryExecutor> = match self {
            Driver::Sqlite => Arc::new(SqliteExecutor::connect(url, max_connections).await?),
            Driver::Postgres => Arc::new(PostgresExecutor::connect(url, max_connections).await?),
            Driver::Mysql => Arc::new(MySqlExecutor::connect(url, max_connections).await?),
        };
        Ok(executor)
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Driver::Sqlite => "sqlite",
            Driver::Postgres => "postgres",
            Driver::Mysql => "mysql",
        };
        f.write_str(name)
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Driver::Sqlite),
            "postgres" | "postgresql" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::Mysql),
            other => Err(format!(
                "Unknown driver '{other}'. Supported drivers: sqlite, postgres, mysql"
            )),
        }
    }
}
