//! Schema checks run before any detection statistic is computed.
//!
//! # Examples
//!
//! ```rust,ignore
//! use vaskify::validation::SchemaValidator;
//!
//! SchemaValidator::new(&batch)
//!     .identifier("unit_id")
//!     .target("turnover")
//!     .time("time_period")
//!     .validate()?;
//! ```

use arrow::array::Array;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::SchemaError;
use crate::panel::{is_string_type, is_valid_period, string_column};

/// Checks the columns one detection call relies on.
///
/// Only the roles that were set are checked. Column existence is checked for
/// every role before any type check, so a missing column is always reported
/// first.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    batch: &'a RecordBatch,
    identifier: Option<&'a str>,
    target: Option<&'a str>,
    time: Option<&'a str>,
    strata: Option<&'a str>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(batch: &'a RecordBatch) -> Self {
        Self {
            batch,
            identifier: None,
            target: None,
            time: None,
            strata: None,
        }
    }

    /// Unit identifier column; must be string-typed.
    pub fn identifier(mut self, column: &'a str) -> Self {
        self.identifier = Some(column);
        self
    }

    /// Variable under test; must be numeric.
    pub fn target(mut self, column: &'a str) -> Self {
        self.target = Some(column);
        self
    }

    /// Time period column; must be string-typed with valid period labels.
    pub fn time(mut self, column: &'a str) -> Self {
        self.time = Some(column);
        self
    }

    /// Stratification column; must exist.
    pub fn strata(mut self, column: &'a str) -> Self {
        self.strata = Some(column);
        self
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        for column in [self.target, self.time, self.identifier, self.strata]
            .into_iter()
            .flatten()
        {
            self.data_type(column)?;
        }

        if let Some(column) = self.identifier {
            let found = self.data_type(column)?;
            if !is_string_type(found) {
                return Err(mismatch(column, "a string", found));
            }
        }

        if let Some(column) = self.target {
            let found = self.data_type(column)?;
            if !found.is_numeric() {
                return Err(mismatch(column, "numeric", found));
            }
        }

        if let Some(column) = self.time {
            let found = self.data_type(column)?;
            if !is_string_type(found) {
                return Err(mismatch(column, "a string", found));
            }
            self.validate_periods(column)?;
        }

        Ok(())
    }

    fn data_type(&self, column: &str) -> Result<&'a DataType, SchemaError> {
        let batch: &'a RecordBatch = self.batch;
        batch
            .schema_ref()
            .field_with_name(column)
            .map(|field| field.data_type())
            .map_err(|_| SchemaError::MissingColumn {
                column: column.to_string(),
            })
    }

    fn validate_periods(&self, column: &str) -> Result<(), SchemaError> {
        // the type check above guarantees the cast is a no-op or a string view conversion
        let periods = string_column(self.batch, column).map_err(|_| SchemaError::TypeMismatch {
            column: column.to_string(),
            expected: "a string".to_string(),
            found: "an unreadable string column".to_string(),
        })?;

        for row in 0..periods.len() {
            let valid = periods.is_valid(row) && is_valid_period(periods.value(row));
            if !valid {
                let value = if periods.is_null(row) {
                    "null".to_string()
                } else {
                    periods.value(row).to_string()
                };
                return Err(SchemaError::InvalidPeriod {
                    column: column.to_string(),
                    row,
                    value,
                });
            }
        }
        Ok(())
    }
}

fn mismatch(column: &str, expected: &str, found: &DataType) -> SchemaError {
    SchemaError::TypeMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
