use std::{fmt, io};

use super::export::ExportError;

/// Crate-wide `Result` type using [`ChivError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ChivError>;

/// Top-level error type for chiv operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used by the binary and by library callers.
#[derive(Debug)]
pub enum ChivError {
    /// A table export failed; carries the stage it failed in.
    Export(ExportError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// Database driver errors raised outside of an export (pool setup).
    Database(sqlx::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Errors raised by a query executor or a row source while producing metadata
/// or ending iteration.
#[derive(Debug)]
pub enum SourceError {
    /// The statement could not be issued.
    Query(String),

    /// Column metadata could not be retrieved.
    Metadata(String),

    /// Driver error.
    Sqlx(sqlx::Error),
}

/// Errors raised while materializing a single row.
#[derive(Debug)]
pub enum ScanError {
    /// `read_row` was called without a preceding successful `advance`.
    NotPositioned,

    /// A column value could not be read.
    Column { index: usize, message: String },
}

/// Errors raised by an uploader while transmitting the stream.
#[derive(Debug)]
pub enum UploadError {
    /// The bucket or key cannot be mapped to a destination.
    InvalidDestination(String),

    /// Local I/O failure, including a broken transport stream.
    Io(io::Error),

    /// HTTP client failure.
    Http(reqwest::Error),

    /// The object store answered with a non-success status.
    Status { status: u16, body: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ChivError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChivError::Export(e) => write!(f, "{e}"),
            ChivError::Config(e) => write!(f, "Configuration error: {e}"),
            ChivError::Io(e) => write!(f, "I/O error: {e}"),
            ChivError::Database(e) => write!(f, "Database error: {e}"),
            ChivError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Query(msg) => write!(f, "query failed: {msg}"),
            SourceError::Metadata(msg) => write!(f, "reading column metadata failed: {msg}"),
            SourceError::Sqlx(e) => write!(f, "database error: {e}"),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::NotPositioned => write!(f, "no current row to read"),
            ScanError::Column { index, message } => {
                write!(f, "reading column {index} failed: {message}")
            }
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::InvalidDestination(msg) => write!(f, "invalid destination: {msg}"),
            UploadError::Io(e) => write!(f, "I/O error: {e}"),
            UploadError::Http(e) => write!(f, "HTTP error: {e}"),
            UploadError::Status { status, body } => {
                if body.is_empty() {
                    write!(f, "object store responded with status {status}")
                } else {
                    write!(f, "object store responded with status {status}: {body}")
                }
            }
        }
    }
}

impl std::error::Error for ChivError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChivError::Export(e) => Some(e),
            ChivError::Io(e) => Some(e),
            ChivError::Database(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ConfigError {}
impl std::error::Error for SourceError {}
impl std::error::Error for ScanError {}
impl std::error::Error for UploadError {}

/* ========================= Conversions ========================= */

impl From<ExportError> for ChivError {
    fn from(err: ExportError) -> Self {
        ChivError::Export(err)
    }
}

impl From<ConfigError> for ChivError {
    fn from(err: ConfigError) -> Self {
        ChivError::Config(err)
    }
}

impl From<io::Error> for ChivError {
    fn from(err: io::Error) -> Self {
        ChivError::Io(err)
    }
}

impl From<sqlx::Error> for ChivError {
    fn from(err: sqlx::Error) -> Self {
        ChivError::Database(err)
    }
}

impl From<String> for ChivError {
    fn from(msg: String) -> Self {
        ChivError::Generic(msg)
    }
}

impl From<&str> for ChivError {
    fn from(msg: &str) -> Self {
        ChivError::Generic(msg.to_owned())
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        SourceError::Sqlx(err)
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::Io(err)
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Http(err)
    }
}
