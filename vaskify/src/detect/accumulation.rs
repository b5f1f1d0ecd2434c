//! Accumulation-error detection.
//!
//! Catches units that report a running total instead of the figure for the
//! period: the value grows by more than the allowed factor over the
//! previous period's value.

use arrow::array::{Float64Array, Int32Array};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::{flag_field, DataOutput, Detector};
use crate::error::Result;
use crate::logging::{DiagnosticKind, LogLevel};
use crate::panel::{filter_units, number, numeric_column, with_column, SortedPanel, UnitSpan};

/// Options for [`Detector::accumulation_error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulationErrorOptions {
    /// Allowed growth factor; a value above `previous * (1 + error)` is
    /// flagged.
    pub error: f64,
    pub flag_name: String,
    /// Imputation is not available for this method; setting it only logs an
    /// error.
    pub impute: bool,
    pub impute_var: Option<String>,
    pub output_format: DataOutput,
}

impl Default for AccumulationErrorOptions {
    fn default() -> Self {
        Self {
            error: 0.5,
            flag_name: "flag_accumulation".to_string(),
            impute: false,
            impute_var: None,
            output_format: DataOutput::Data,
        }
    }
}

impl AccumulationErrorOptions {
    pub fn with_error(mut self, error: f64) -> Self {
        self.error = error;
        self
    }

    pub fn with_flag_name(mut self, flag_name: impl Into<String>) -> Self {
        self.flag_name = flag_name.into();
        self
    }

    pub fn with_impute(mut self, impute: bool) -> Self {
        self.impute = impute;
        self
    }

    pub fn with_impute_var(mut self, impute_var: impl Into<String>) -> Self {
        self.impute_var = Some(impute_var.into());
        self
    }

    pub fn with_output_format(mut self, output_format: DataOutput) -> Self {
        self.output_format = output_format;
        self
    }
}

impl Detector {
    /// Flags values that exceed the unit's previous value by more than the
    /// allowed factor.
    ///
    /// With [`DataOutput::Outliers`] only units whose every row is flagged or
    /// has no usable predecessor are returned. A unit with a single row
    /// therefore always qualifies.
    #[instrument(skip(self, options), fields(method = "accumulation_error", rows = self.data.num_rows()))]
    pub fn accumulation_error(
        &self,
        y_var: &str,
        time_var: &str,
        options: &AccumulationErrorOptions,
    ) -> Result<RecordBatch> {
        self.validate_columns(y_var, time_var, None)?;

        if options.impute {
            self.impute_column(y_var, options.impute_var.as_deref(), |name| {
                format!("No imputed variable name given so {name} is being used")
            });
        }

        let panel = SortedPanel::sort(&self.data, &self.id_column, time_var)?;
        let values = numeric_column(panel.batch(), y_var)?;
        let flags = accumulation_flags(panel.spans(), &values, options.error);

        if options.impute {
            self.diagnose(
                LogLevel::Error,
                DiagnosticKind::UnsupportedOperation,
                "Imputation not implemented for this method.",
            );
        }

        let result = with_column(
            panel.batch(),
            flag_field(&options.flag_name),
            Arc::new(Int32Array::from(flags.clone())),
        )?;

        match options.output_format {
            DataOutput::Data => Ok(result),
            DataOutput::Outliers => {
                let units: HashSet<String> = panel
                    .spans()
                    .iter()
                    .filter(|span| {
                        span.rows()
                            .all(|row| matches!(flags[row], Some(1) | None))
                    })
                    .filter_map(|span| span.id.clone())
                    .collect();

                self.diagnose(
                    LogLevel::Info,
                    DiagnosticKind::Progress,
                    format!(
                        "Number of units identified with possible accumulation errors: {}",
                        units.len()
                    ),
                );
                filter_units(&result, &self.id_column, &units)
            }
        }
    }
}

/// Computes the accumulation flag of every row of a sorted panel.
fn accumulation_flags(spans: &[UnitSpan], values: &Float64Array, error: f64) -> Vec<Option<i32>> {
    let mut flags = vec![None; values.len()];

    for span in spans.iter().filter(|span| span.id.is_some()) {
        for row in span.rows().skip(1) {
            flags[row] = number(values, row - 1).map(|expected| {
                let grew = number(values, row).is_some_and(|y| y > expected * (1.0 + error));
                i32::from(grew)
            });
        }
    }
    flags
}
