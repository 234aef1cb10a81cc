//! In-memory row source
//!
//! Replays a recorded set of rows. Useful when the rows already live in
//! memory, and as a deterministic stand-in for a live query in tests.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::{ScanError, SourceError};

use super::{ColumnDescriptor, Row, RowSource};

/// Row source that replays recorded rows
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Row>,
    current: Option<Row>,
    failure: Option<String>,
    metadata_failure: Option<String>,
}

impl MemoryRowSource {
    /// Create a row source over the given columns and rows
    ///
    /// # Arguments
    /// * `columns` - Column descriptors reported by `columns()`
    /// * `rows` - Rows yielded in order
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            ..Default::default()
        }
    }

    /// Create a row source from textual values; `None` entries are NULL.
    pub fn from_text(columns: Vec<ColumnDescriptor>, rows: &[Vec<Option<&str>>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| value.map(|v| v.as_bytes().to_vec()))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    /// End iteration with an error after the recorded rows are exhausted.
    pub fn with_terminal_error(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Fail `columns()` with the given message.
    pub fn with_metadata_error(mut self, message: impl Into<String>) -> Self {
        self.metadata_failure = Some(message.into());
        self
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    fn columns(&self) -> Result<Vec<ColumnDescriptor>, SourceError> {
        match &self.metadata_failure {
            Some(message) => Err(SourceError::Metadata(message.clone())),
            None => Ok(self.columns.clone()),
        }
    }

    async fn advance(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    fn read_row(&mut self) -> Result<Row, ScanError> {
        self.current.take().ok_or(ScanError::NotPositioned)
    }

    fn terminal_error(&mut self) -> Option<SourceError> {
        self.failure.take().map(SourceError::Query)
    }
}
