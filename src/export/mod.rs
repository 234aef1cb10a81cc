//! Streaming export pipeline
//!
//! This module streams the rows of a query result to an object store without
//! holding the result in memory:
//!
//! - [`Archiver`]: owns configuration and coordinates one export
//! - [`streaming`]: the download task (rows → formatter → transport)
//! - [`transport`]: bounded byte pipe between the download and upload tasks
//! - [`formatters`]: CSV, JSON and YAML record formatters
//! - [`options`]: per-export configuration and key resolution
//! - [`progress`]: optional progress spinner
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chiv::export::{Archiver, ExportOption, FormatKind};
//! use chiv::source::SqliteExecutor;
//! use chiv::upload::FsUploader;
//!
//! # async fn example() -> chiv::error::Result<()> {
//! let executor = SqliteExecutor::connect("sqlite://shop.db", 4).await?;
//! let archiver = Archiver::new(Arc::new(executor), Arc::new(FsUploader::new("/srv/archive")))
//!     .configure(&[ExportOption::format(FormatKind::Json)]);
//!
//! let summary = archiver.export("orders", "backups", &[]).await?;
//! assert_eq!(summary.key, "orders.json");
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod formatters;
pub mod options;
pub mod progress;
pub mod streaming;
pub mod transport;

pub use coordinator::{Archiver, ExportSummary};
pub use formatters::{FormatKind, RecordFormatter};
pub use options::{ExportOption, ExportOptions};
pub use progress::ProgressTracker;
pub use transport::{TransportReader, TransportWriter, pipe};
