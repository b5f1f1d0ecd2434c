//! Error types for the vaskify detection engine.
//!
//! Schema violations are the only fatal condition during detection and have
//! their own enum, [`SchemaError`], so callers can match on them separately.
//! Everything else the crate can fail with is collected in [`VaskError`].

use thiserror::Error;

/// A violation of the panel schema contract.
///
/// Raised before any statistic is computed: construction of a
/// [`Detector`](crate::detect::Detector) and every detection call fail closed
/// on these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A referenced column is not present in the dataset.
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// A column has the wrong data type for its role.
    #[error("Column '{column}' should be {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// A time period value does not match any accepted period format.
    #[error(
        "Column '{column}' row {row}: '{value}' should be in the format 'YYYY', 'YYYY-Qq', 'YYYY-MM', 'YYYY-Www', 'YYYY-MM-DD' or 'YYYY-DDD'"
    )]
    InvalidPeriod {
        column: String,
        row: usize,
        value: String,
    },
}

impl SchemaError {
    /// Returns the name of the offending column.
    pub fn column(&self) -> &str {
        match self {
            SchemaError::MissingColumn { column }
            | SchemaError::TypeMismatch { column, .. }
            | SchemaError::InvalidPeriod { column, .. } => column,
        }
    }
}

/// The main error type for the vaskify crate.
#[derive(Error, Debug)]
pub enum VaskError {
    /// The dataset does not satisfy the schema a call needs.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "Parquet")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter or option value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, VaskError>`.
pub type Result<T> = std::result::Result<T, VaskError>;

impl VaskError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns the schema violation if this is one.
    pub fn as_schema(&self) -> Option<&SchemaError> {
        match self {
            VaskError::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for VaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<VaskError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            // schema violations keep their variant so callers can still match on them
            VaskError::Schema(schema) => VaskError::Schema(schema),
            VaskError::Internal(inner) => VaskError::Internal(format!("{}: {}", f(), inner)),
            other => VaskError::Internal(format!("{}: {}", f(), other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_missing_column_message() {
        let err = SchemaError::MissingColumn {
            column: "turnover".to_string(),
        };
        assert_eq!(err.to_string(), "Missing column: turnover");
        assert_eq!(err.column(), "turnover");
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = SchemaError::TypeMismatch {
            column: "unit_id".to_string(),
            expected: "a string".to_string(),
            found: "Int64".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column 'unit_id' should be a string, found Int64"
        );
    }

    #[test]
    fn test_schema_error_converts() {
        let err: VaskError = SchemaError::InvalidPeriod {
            column: "time_period".to_string(),
            row: 3,
            value: "2020/01".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Schema error:"));
        assert!(err.to_string().contains("2020/01"));
        assert_eq!(err.as_schema().map(SchemaError::column), Some("time_period"));
    }

    #[test]
    fn test_data_source_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = VaskError::data_source_with_source("CSV", "Could not read panel", Box::new(source));
        assert_eq!(err.to_string(), "Data source error: Could not read panel");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(VaskError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation().context("While sorting panel").unwrap_err();
        assert!(err.to_string().contains("While sorting panel"));
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_error_context_keeps_schema_errors() {
        let result: std::result::Result<(), SchemaError> = Err(SchemaError::MissingColumn {
            column: "y".to_string(),
        });
        let err = result.context("loading").unwrap_err();
        assert!(err.as_schema().is_some());
    }
}
