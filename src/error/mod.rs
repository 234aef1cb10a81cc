//! Error handling module for chiv.
//!
//! This module provides:
//! - A crate-wide [`ChivError`] and `Result` alias
//! - Stage-tagged [`ExportError`]s returned by every export
//! - Collaborator errors for row sources and uploaders
//!
//! # Example
//!
//! ```rust,no_run
//! use chiv::error::{ExportError, ExportErrorKind, Stage};
//!
//! fn report(err: &ExportError) {
//!     match (err.stage(), err.kind()) {
//!         (_, ExportErrorKind::Cancelled) => eprintln!("export cancelled"),
//!         (Stage::Uploading, kind) => eprintln!("upload rejected: {kind}"),
//!         (stage, kind) => eprintln!("{stage} failed: {kind}"),
//!     }
//! }
//! ```

pub mod export;
pub mod kinds;

// Re-export commonly used types
pub use export::{ExportError, ExportErrorKind, FormatError, Stage};
pub use kinds::{ChivError, ConfigError, Result, ScanError, SourceError, UploadError};
