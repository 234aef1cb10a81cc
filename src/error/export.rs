//! Staged export errors.
//!
//! Every export failure is tagged with the pipeline stage it happened in, so
//! callers can tell a broken query from a rejected upload without matching on
//! driver or client error types.

use std::{fmt, io};

use crate::source::ScalarKind;

use super::kinds::{ScanError, SourceError, UploadError};

/// Pipeline stage an export error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Issuing the statement and reading column metadata.
    Querying,
    /// Pulling rows from the row source.
    Downloading,
    /// Encoding rows and writing them into the transport.
    Formatting,
    /// Transmitting the stream to the object store.
    Uploading,
}

/// What went wrong during an export.
#[derive(Debug)]
pub enum ExportErrorKind {
    /// Query or metadata failure, or a terminal iteration error.
    Source(SourceError),

    /// A row could not be materialized.
    Scan(ScanError),

    /// A record did not carry one value per column.
    RecordLength { expected: usize, found: usize },

    /// A value could not be converted to its column's scalar kind.
    Parse {
        column: String,
        value: String,
        kind: ScalarKind,
    },

    /// The formatter could not write to its sink.
    Write(io::Error),

    /// The stream between the download and upload tasks broke.
    Transport(io::Error),

    /// The uploader failed.
    Upload(UploadError),

    /// The caller cancelled the export.
    Cancelled,

    /// The export cannot start with the given options.
    Configuration(String),
}

/// Error returned by a failed export.
#[derive(Debug)]
pub struct ExportError {
    stage: Stage,
    kind: ExportErrorKind,
}

impl ExportError {
    /// Create an error for the given stage
    pub fn new(stage: Stage, kind: ExportErrorKind) -> Self {
        Self { stage, kind }
    }

    /// Cancellation observed during `stage`.
    pub fn cancelled(stage: Stage) -> Self {
        Self::new(stage, ExportErrorKind::Cancelled)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn kind(&self) -> &ExportErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ExportErrorKind {
        self.kind
    }

    /// Whether the export ended because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ExportErrorKind::Cancelled)
    }
}

/// Errors produced by a record formatter.
#[derive(Debug)]
pub enum FormatError {
    /// Record length does not match the number of columns.
    RecordLength { expected: usize, found: usize },

    /// Type-directed scalar conversion failed.
    Parse {
        column: String,
        value: String,
        kind: ScalarKind,
    },

    /// Writing to the sink failed.
    Write(io::Error),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Querying => "querying",
            Stage::Downloading => "downloading",
            Stage::Formatting => "formatting",
            Stage::Uploading => "uploading",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ExportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportErrorKind::Source(e) => write!(f, "{e}"),
            ExportErrorKind::Scan(e) => write!(f, "{e}"),
            ExportErrorKind::RecordLength { expected, found } => write!(
                f,
                "record length {found} does not match number of columns {expected}"
            ),
            ExportErrorKind::Parse {
                column,
                value,
                kind,
            } => write!(f, "cannot parse '{value}' as {kind} for column '{column}'"),
            ExportErrorKind::Write(e) => write!(f, "write failed: {e}"),
            ExportErrorKind::Transport(e) => write!(f, "transport closed: {e}"),
            ExportErrorKind::Upload(e) => write!(f, "{e}"),
            ExportErrorKind::Cancelled => write!(f, "export cancelled"),
            ExportErrorKind::Configuration(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Export failed while {}: {}", self.stage, self.kind)
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::RecordLength { expected, found } => write!(
                f,
                "record length {found} does not match number of columns {expected}"
            ),
            FormatError::Parse {
                column,
                value,
                kind,
            } => write!(f, "cannot parse '{value}' as {kind} for column '{column}'"),
            FormatError::Write(e) => write!(f, "write failed: {e}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ExportErrorKind::Source(e) => Some(e),
            ExportErrorKind::Scan(e) => Some(e),
            ExportErrorKind::Write(e) | ExportErrorKind::Transport(e) => Some(e),
            ExportErrorKind::Upload(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for FormatError {}

/* ========================= Conversions ========================= */

impl From<io::Error> for FormatError {
    fn from(err: io::Error) -> Self {
        FormatError::Write(err)
    }
}

impl From<FormatError> for ExportErrorKind {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::RecordLength { expected, found } => {
                ExportErrorKind::RecordLength { expected, found }
            }
            FormatError::Parse {
                column,
                value,
                kind,
            } => ExportErrorKind::Parse {
                column,
                value,
                kind,
            },
            // The consumer hung up; this is the transport breaking, not the formatter.
            FormatError::Write(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                ExportErrorKind::Transport(e)
            }
            FormatError::Write(e) => ExportErrorKind::Write(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_stage() {
        let err = ExportError::new(
            Stage::Formatting,
            ExportErrorKind::RecordLength {
                expected: 3,
                found: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "Export failed while formatting: record length 2 does not match number of columns 3"
        );
    }

    #[test]
    fn test_broken_pipe_maps_to_transport() {
        let err = FormatError::Write(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(
            ExportErrorKind::from(err),
            ExportErrorKind::Transport(_)
        ));

        let err = FormatError::Write(io::Error::other("disk full"));
        assert!(matches!(ExportErrorKind::from(err), ExportErrorKind::Write(_)));
    }

    #[test]
    fn test_cancelled() {
        let err = ExportError::cancelled(Stage::Uploading);
        assert!(err.is_cancelled());
        assert_eq!(err.stage(), Stage::Uploading);
    }
}
