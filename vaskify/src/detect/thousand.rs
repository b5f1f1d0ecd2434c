//! Thousand-error detection.
//!
//! A value reported in units instead of thousands (or the reverse) shows up as
//! a jump of about three orders of magnitude from the previous period, so the
//! test looks at first differences of `log10(y)` within each unit.

use arrow::array::{Float64Array, Int32Array};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{flag_field, DataOutput, Detector};
use crate::error::Result;
use crate::panel::{filter_units, number, numeric_column, with_column, SortedPanel, UnitSpan};

/// Options for [`Detector::thousand_error`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThousandErrorOptions {
    /// Lower bound on the log10 difference; smaller differences are flagged.
    pub lower_bound: f64,
    /// Upper bound on the log10 difference; larger differences are flagged.
    pub upper_bound: f64,
    pub flag_name: String,
    /// Adds a copy of the target with flagged values divided by 1000.
    pub impute: bool,
    /// Name of the imputed column; defaults to `{y_var}_imputed`.
    pub impute_var: Option<String>,
    pub output_format: DataOutput,
}

impl Default for ThousandErrorOptions {
    fn default() -> Self {
        Self {
            lower_bound: -2.5,
            upper_bound: 2.5,
            flag_name: "flag_thousand".to_string(),
            impute: false,
            impute_var: None,
            output_format: DataOutput::Data,
        }
    }
}

impl ThousandErrorOptions {
    pub fn with_bounds(mut self, lower_bound: f64, upper_bound: f64) -> Self {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
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
    /// Flags values that differ from the unit's previous period by more than
    /// the configured log10 bounds.
    ///
    /// The result is sorted by `(unit, period)`. The flag is null on each
    /// unit's first row, where either value is missing or negative, and on
    /// rows without a unit identifier. A step to or from zero is an infinite
    /// log change and is flagged, unless both values are zero.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let options = ThousandErrorOptions::default().with_impute(true);
    /// let flagged = detector.thousand_error("turnover", "time_period", &options)?;
    /// ```
    #[instrument(skip(self, options), fields(method = "thousand_error", rows = self.data.num_rows()))]
    pub fn thousand_error(
        &self,
        y_var: &str,
        time_var: &str,
        options: &ThousandErrorOptions,
    ) -> Result<RecordBatch> {
        self.validate_columns(y_var, time_var, None)?;

        let impute_var = options.impute.then(|| {
            self.impute_column(y_var, options.impute_var.as_deref(), |name| {
                format!("No impute variable given so using {name}")
            })
        });

        let panel = SortedPanel::sort(&self.data, &self.id_column, time_var)?;
        let values = numeric_column(panel.batch(), y_var)?;
        let flags = thousand_flags(
            panel.spans(),
            &values,
            options.lower_bound,
            options.upper_bound,
        );

        let mut result = with_column(
            panel.batch(),
            flag_field(&options.flag_name),
            Arc::new(Int32Array::from(flags.clone())),
        )?;

        if let Some(impute_var) = impute_var {
            let imputed: Float64Array = values
                .iter()
                .zip(&flags)
                .map(|(value, flag)| match flag {
                    Some(1) => value.map(|v| v / 1000.0),
                    _ => value,
                })
                .collect();
            result = with_column(
                &result,
                Field::new(impute_var, DataType::Float64, true),
                Arc::new(imputed),
            )?;
        }

        let flagged = flags.iter().filter(|flag| **flag == Some(1)).count();
        debug!(flagged, "thousand-error flags computed");

        match options.output_format {
            DataOutput::Data => Ok(result),
            DataOutput::Outliers => {
                let units: HashSet<String> = (0..panel.num_rows())
                    .filter(|&row| flags[row] == Some(1))
                    .filter_map(|row| panel.id(row).map(str::to_string))
                    .collect();
                filter_units(&result, &self.id_column, &units)
            }
        }
    }
}

/// Computes the thousand-error flag of every row of a sorted panel.
fn thousand_flags(
    spans: &[UnitSpan],
    values: &Float64Array,
    lower_bound: f64,
    upper_bound: f64,
) -> Vec<Option<i32>> {
    let log10 = |row: usize| number(values, row).map_or(f64::NAN, f64::log10);
    let mut flags = vec![None; values.len()];

    for span in spans.iter().filter(|span| span.id.is_some()) {
        for row in span.rows().skip(1) {
            let diff = log10(row) - log10(row - 1);
            flags[row] = if diff.is_nan() {
                None
            } else if diff < lower_bound || diff > upper_bound {
                Some(1)
            } else {
                Some(0)
            };
        }
    }
    flags
}
