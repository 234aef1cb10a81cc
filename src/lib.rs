//! chiv library
//!
//! Streams the result of a relational query to an object store as CSV, JSON
//! or YAML with bounded memory, whatever the size of the table.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: The export pipeline (archiver, formatters, transport)
//! - `source`: Row sources and query executors
//! - `upload`: Object-store uploaders
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chiv::{Archiver, source::SqliteExecutor, upload::FsUploader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = SqliteExecutor::connect("sqlite://shop.db", 4).await?;
//!     let archiver = Archiver::new(Arc::new(executor), Arc::new(FsUploader::new("./store")));
//!
//!     let summary = archiver.export("orders", "backups", &[]).await?;
//!     println!("Stored {} rows under {}", summary.records, summary.key);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod source;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChivError, ExportError, Result};
pub use export::{Archiver, ExportOption, ExportSummary, FormatKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
