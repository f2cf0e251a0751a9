//! Error types for the Quarry library.
//!
//! All errors are represented by the [`QuarryError`] enum. Construction-time
//! argument problems surface as [`QuarryError::InvalidArgument`], operations an
//! enumerator or reader cannot perform as [`QuarryError::Unsupported`], and
//! storage failures are propagated unchanged through [`QuarryError::Io`].
//!
//! # Examples
//!
//! ```
//! use quarry::error::{QuarryError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(QuarryError::invalid_argument("Nil bounds for range"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Quarry operations.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// I/O errors from the storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors (closed reader, unknown document, ...).
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors.
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid arguments given when constructing queries, filters or sorts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not supported by this object.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with QuarryError.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl QuarryError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        QuarryError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        QuarryError::Query(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        QuarryError::InvalidArgument(msg.into())
    }

    /// Create a new unsupported operation error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        QuarryError::Unsupported(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        QuarryError::Other(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        QuarryError::Index(format!("Not found: {}", msg.into()))
    }

    /// Returns true for construction-time argument errors.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, QuarryError::InvalidArgument(_))
    }

    /// Returns true for unsupported operation errors.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, QuarryError::Unsupported(_))
    }
}
