//! Synthetic business-survey panels.
//!
//! Generated panels have one row per unit per period with the columns
//! `unit_id`, `time_period`, `category_code`, `employee_count` and
//! `turnover`. A fixed seed always gives the same panel.

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Months, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, VaskError};

/// Industry codes assigned to generated units.
pub const CATEGORY_CODES: [&str; 9] = ["B", "C", "F", "G", "H", "J", "M", "N", "S"];

/// Spacing of generated periods. Every panel starts in January 2020.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodGranularity {
    /// `2020-01`, `2020-02`, ...
    #[default]
    Monthly,
    /// `2020-Q1`, `2020-Q2`, ...
    Quarterly,
    /// `2020`, `2021`, ...
    Yearly,
}

impl PeriodGranularity {
    fn months(&self) -> u32 {
        match self {
            PeriodGranularity::Monthly => 1,
            PeriodGranularity::Quarterly => 3,
            PeriodGranularity::Yearly => 12,
        }
    }

    fn label(&self, date: NaiveDate) -> String {
        match self {
            PeriodGranularity::Monthly => date.format("%Y-%m").to_string(),
            PeriodGranularity::Quarterly => {
                format!("{}-Q{}", date.year(), date.month0() / 3 + 1)
            }
            PeriodGranularity::Yearly => date.year().to_string(),
        }
    }

    /// The first `count` period labels.
    pub fn periods(&self, count: usize) -> Result<Vec<String>> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .ok_or_else(|| VaskError::Internal("invalid start date".to_string()))?;
        (0..count)
            .map(|i| {
                let offset = u32::try_from(i)
                    .ok()
                    .and_then(|i| i.checked_mul(self.months()))
                    .ok_or_else(|| VaskError::configuration("too many periods"))?;
                let date = start
                    .checked_add_months(Months::new(offset))
                    .ok_or_else(|| VaskError::configuration("period out of calendar range"))?;
                Ok(self.label(date))
            })
            .collect()
    }
}

impl fmt::Display for PeriodGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodGranularity::Monthly => write!(f, "monthly"),
            PeriodGranularity::Quarterly => write!(f, "quarterly"),
            PeriodGranularity::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for PeriodGranularity {
    type Err = VaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(PeriodGranularity::Monthly),
            "quarterly" => Ok(PeriodGranularity::Quarterly),
            "yearly" => Ok(PeriodGranularity::Yearly),
            _ => Err(VaskError::configuration(format!(
                "unknown period granularity '{s}', expected monthly, quarterly or yearly"
            ))),
        }
    }
}

/// Generates a panel of `num_units` units over `num_periods` periods.
///
/// Each unit gets one category code. Employee counts are drawn per row from
/// `10..500`. Turnover is the employee count times a turnover per employee
/// drawn once per panel from `[5000, 20000)`, rounded to two decimals.
///
/// ```rust
/// use vaskify::testdata::{generate_panel, PeriodGranularity};
///
/// let panel = generate_panel(5, 2, PeriodGranularity::Monthly, 42).unwrap();
/// assert_eq!(panel.num_rows(), 10);
/// ```
pub fn generate_panel(
    num_units: usize,
    num_periods: usize,
    granularity: PeriodGranularity,
    seed: u64,
) -> Result<RecordBatch> {
    let mut rng = StdRng::seed_from_u64(seed);
    let periods = granularity.periods(num_periods)?;
    let rows = num_units * num_periods;

    let categories: Vec<&str> = (0..num_units)
        .map(|_| CATEGORY_CODES[rng.random_range(0..CATEGORY_CODES.len())])
        .collect();
    let employees: Vec<i64> = (0..rows).map(|_| rng.random_range(10..500)).collect();
    let per_employee: f64 = rng.random_range(5000.0..20000.0);

    let mut unit_ids = Vec::with_capacity(rows);
    let mut time_periods = Vec::with_capacity(rows);
    let mut category_codes = Vec::with_capacity(rows);
    for (unit, category) in categories.iter().enumerate() {
        for period in &periods {
            unit_ids.push(unit.to_string());
            time_periods.push(period.as_str());
            category_codes.push(*category);
        }
    }
    let turnover: Vec<f64> = employees
        .iter()
        .map(|&count| (count as f64 * per_employee * 100.0).round() / 100.0)
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("unit_id", DataType::Utf8, false),
        Field::new("time_period", DataType::Utf8, false),
        Field::new("category_code", DataType::Utf8, false),
        Field::new("employee_count", DataType::Int64, false),
        Field::new("turnover", DataType::Float64, false),
    ]));

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(unit_ids)),
            Arc::new(StringArray::from(time_periods)),
            Arc::new(StringArray::from(category_codes)),
            Arc::new(Int64Array::from(employees)),
            Arc::new(Float64Array::from(turnover)),
        ],
    )?)
}
