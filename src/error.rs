//! Centralized error handling for tabletalk.
//!
//! Every failure the pipeline, ingestion, export and question-answering paths
//! can report is one variant of [`TableTalkError`]. All of them are recoverable
//! at the session boundary: a failed `apply` leaves the pipeline untouched and
//! the message is shown to the user.
//!
//! ```
//! use tabletalk::error::TableTalkError;
//!
//! fn describe(err: &TableTalkError) -> &'static str {
//!     match err {
//!         TableTalkError::OperationPrecondition(_) => "pick another column",
//!         TableTalkError::InvalidOperation(_) => "check the operation parameters",
//!         TableTalkError::TypeCast(_) => "the column cannot be converted",
//!         _ => "something else went wrong",
//!     }
//! }
//! ```

use thiserror::Error;

/// Main error type for tabletalk operations.
#[derive(Debug, Error)]
pub enum TableTalkError {
    /// I/O errors (reading uploads, writing exports)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The uploaded bytes could not be turned into a table
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// The operation targets a missing column or a column of the wrong dtype
    #[error("Operation not applicable: {0}")]
    OperationPrecondition(String),

    /// The operation parameters are invalid (e.g. division by zero)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A value could not be converted to the requested type
    #[error("Type conversion failed: {0}")]
    TypeCast(String),

    /// The question-answering service failed or returned nothing usable
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Errors raised by the table engine
    #[error("Data processing error: {0}")]
    DataProcessing(String),

    /// Configuration errors (missing credentials, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization of the current table failed
    #[error("Export error: {0}")]
    Export(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<polars::error::PolarsError> for TableTalkError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<serde_json::Error> for TableTalkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<anyhow::Error> for TableTalkError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for TableTalkError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for tabletalk operations.
pub type Result<T> = std::result::Result<T, TableTalkError>;
