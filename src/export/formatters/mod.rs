//! Record formatters for export operations
//!
//! A formatter turns rows of raw column values into one of the supported
//! notations and writes the encoded bytes to an asynchronous sink. Formatters
//! are stateful and driven through `open → format* → close` exactly once per
//! export; any framing (headers, brackets) belongs to them.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::error::FormatError;
use crate::source::ColumnDescriptor;

pub mod csv;
pub mod json;
pub mod scalar;
pub mod yaml;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use scalar::{Record, Scalar, TypedColumns};
pub use yaml::YamlFormatter;

/// Trait for encoding records into an output notation
#[async_trait]
pub trait RecordFormatter: Send {
    /// Write any leading framing (header row, opening bracket)
    async fn open(&mut self) -> Result<(), FormatError>;

    /// Encode and write a single record
    ///
    /// # Arguments
    /// * `record` - Raw values, one per column; `None` is an absent value
    ///
    /// # Returns
    /// * `Result<(), FormatError>` - Length, parse or write error
    async fn format(&mut self, record: &[Option<Vec<u8>>]) -> Result<(), FormatError>;

    /// Write any trailing framing, then flush and shut down the sink
    async fn close(&mut self) -> Result<(), FormatError>;

    /// File extension objects in this notation are stored under
    fn extension(&self) -> Option<&'static str> {
        None
    }

    /// Number of records formatted so far
    fn records_written(&self) -> u64;
}

/// Output notations
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// One JSON array of objects
    Json,
    /// A YAML sequence of mappings
    Yaml,
}

impl FormatKind {
    /// Default file extension of the notation
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Csv => "csv",
            FormatKind::Json => "json",
            FormatKind::Yaml => "yaml",
        }
    }

    /// Build a formatter of this kind over a sink
    ///
    /// # Arguments
    /// * `writer` - Sink the encoded output is written to
    /// * `columns` - Columns of the exported result
    ///
    /// # Returns
    /// * `Box<dyn RecordFormatter + 'w>` - Formatter ready to be opened
    pub fn formatter<'w, W>(
        self,
        writer: W,
        columns: &[ColumnDescriptor],
    ) -> Box<dyn RecordFormatter + 'w>
    where
        W: AsyncWrite + Unpin + Send + 'w,
    {
        match self {
            FormatKind::Csv => Box::new(CsvFormatter::new(writer, columns)),
            FormatKind::Json => Box::new(JsonFormatter::new(writer, columns)),
            FormatKind::Yaml => Box::new(YamlFormatter::new(writer, columns)),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FormatKind::Csv),
            "json" => Ok(FormatKind::Json),
            "yaml" | "yml" => Ok(FormatKind::Yaml),
            other => Err(format!(
                "Unknown format '{other}'. Supported formats: csv, json, yaml"
            )),
        }
    }
}
