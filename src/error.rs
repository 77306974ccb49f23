//! Error types for the SMS spam detector.
//!
//! All fallible operations in the crate return [`Result`], whose error type is
//! [`SpamError`]. The variants follow the failure categories of the system:
//! configuration problems, unusable data, unavailable models, metric bugs and
//! result-document problems.
//!
//! # Examples
//!
//! ```
//! use sms_spam_detector::error::{Result, SpamError};
//!
//! fn load_something() -> Result<()> {
//!     Err(SpamError::model_unavailable("baseline model has not been trained"))
//! }
//!
//! match load_something() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for spam detector operations.
#[derive(Error, Debug)]
pub enum SpamError {
    /// I/O errors (file operations, sockets, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing or invalid configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dataset missing, malformed or empty after cleaning.
    #[error("Data error: {0}")]
    Data(String),

    /// The split fraction lies outside the open interval (0, 1).
    #[error("Invalid test fraction: {0} (expected a value in (0, 1))")]
    InvalidFraction(f64),

    /// A label partition has no members, so stratification is impossible.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// A requested model is not trained, not loaded or unknown.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Label sequences of different length were given to the metrics calculator.
    #[error("Length mismatch: {y_true} true labels but {y_pred} predictions")]
    LengthMismatch { y_true: usize, y_pred: usize },

    /// Metric computation failed for a reason other than a length mismatch.
    #[error("Metric computation error: {0}")]
    MetricComputation(String),

    /// A persisted document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A persisted document exists but cannot be decoded.
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// An operation was called in a state that does not allow it.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SpamError.
pub type Result<T> = std::result::Result<T, SpamError>;

impl SpamError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        SpamError::Configuration(msg.into())
    }

    /// Create a new data error.
    pub fn data<S: Into<String>>(msg: S) -> Self {
        SpamError::Data(msg.into())
    }

    /// Create a new empty dataset error.
    pub fn empty_dataset<S: Into<String>>(msg: S) -> Self {
        SpamError::EmptyDataset(msg.into())
    }

    /// Create a new model unavailable error.
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        SpamError::ModelUnavailable(msg.into())
    }

    /// Create a new metric computation error.
    pub fn metric<S: Into<String>>(msg: S) -> Self {
        SpamError::MetricComputation(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        SpamError::NotFound(msg.into())
    }

    /// Create a new corrupt document error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        SpamError::CorruptDocument(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        SpamError::InvalidOperation(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SpamError::Other(msg.into())
    }

    /// Whether a persisted artifact is absent or unreadable.
    ///
    /// Readers of the result document use this to fall back to an
    /// "unavailable" view instead of failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SpamError::NotFound(_) | SpamError::CorruptDocument(_))
    }

    /// Whether this error signals a bug in metric computation.
    pub fn is_metric_error(&self) -> bool {
        matches!(
            self,
            SpamError::LengthMismatch { .. } | SpamError::MetricComputation(_)
        )
    }
}
