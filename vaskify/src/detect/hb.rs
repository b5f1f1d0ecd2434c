//! Hidiroglou-Berthelot outlier detection.
//!
//! The method compares each unit's value in period `t` with its value in
//! `t-1`. Ratios are centred on their median with an asymmetric transform,
//! weighted by the size of the unit (`max(y_t, y_t-1)^pu`), and the quartiles
//! of these effects define an acceptance interval. A unit whose ratio falls
//! outside its own limits is flagged.
//!
//! Thresholds are computed over all units, or independently per stratum.

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::stats::{median, quantiles};
use super::{flag_field, Detector, HbOutput};
use crate::error::{Result, VaskError};
use crate::logging::{DiagnosticKind, LogLevel};
use crate::panel::{label, number, numeric_column, string_column};

/// Options for [`Detector::hb`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HbOptions {
    /// Restricts the panel to these two period labels before testing.
    pub time_periods: Option<(String, String)>,
    /// Computes thresholds separately within each value of this column.
    pub strata_var: Option<String>,
    /// Weight of unit size in the effect.
    pub pu: f64,
    /// Protects against a very narrow interval when the quartiles are close
    /// to the median.
    pub pa: f64,
    /// Width of the acceptance interval.
    pub pc: f64,
    /// Lower and upper percentile of the effects.
    pub percentiles: (f64, f64),
    pub flag_name: String,
    pub output_format: HbOutput,
}

impl Default for HbOptions {
    fn default() -> Self {
        let parameters = HbParameters::default();
        Self {
            time_periods: None,
            strata_var: None,
            pu: parameters.pu,
            pa: parameters.pa,
            pc: parameters.pc,
            percentiles: parameters.percentiles,
            flag_name: "flag_hb".to_string(),
            output_format: HbOutput::Wide,
        }
    }
}

impl HbOptions {
    pub fn with_time_periods(mut self, previous: impl Into<String>, current: impl Into<String>) -> Self {
        self.time_periods = Some((previous.into(), current.into()));
        self
    }

    pub fn with_strata(mut self, strata_var: impl Into<String>) -> Self {
        self.strata_var = Some(strata_var.into());
        self
    }

    pub fn with_pu(mut self, pu: f64) -> Self {
        self.pu = pu;
        self
    }

    pub fn with_pa(mut self, pa: f64) -> Self {
        self.pa = pa;
        self
    }

    pub fn with_pc(mut self, pc: f64) -> Self {
        self.pc = pc;
        self
    }

    pub fn with_percentiles(mut self, lower: f64, upper: f64) -> Self {
        self.percentiles = (lower, upper);
        self
    }

    pub fn with_flag_name(mut self, flag_name: impl Into<String>) -> Self {
        self.flag_name = flag_name.into();
        self
    }

    pub fn with_output_format(mut self, output_format: HbOutput) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn parameters(&self) -> HbParameters {
        HbParameters {
            pu: self.pu,
            pa: self.pa,
            pc: self.pc,
            percentiles: self.percentiles,
        }
    }
}

/// Tuning parameters of the HB interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HbParameters {
    pub pu: f64,
    pub pa: f64,
    pub pc: f64,
    pub percentiles: (f64, f64),
}

impl Default for HbParameters {
    fn default() -> Self {
        Self {
            pu: 0.5,
            pa: 0.05,
            pc: 20.0,
            percentiles: (0.25, 0.75),
        }
    }
}

impl HbParameters {
    /// Rejects percentiles outside `[0, 1]` or in the wrong order.
    pub fn validate(&self) -> Result<()> {
        let (lower, upper) = self.percentiles;
        let in_range = |p: f64| (0.0..=1.0).contains(&p);
        if !in_range(lower) || !in_range(upper) {
            return Err(VaskError::configuration(format!(
                "HB percentiles must lie in [0, 1], got ({lower}, {upper})"
            )));
        }
        if lower > upper {
            return Err(VaskError::configuration(format!(
                "HB lower percentile {lower} is greater than upper percentile {upper}"
            )));
        }
        Ok(())
    }
}

/// Acceptance limits for one unit's ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HbLimits {
    pub lower: f64,
    pub upper: f64,
}

impl HbLimits {
    pub fn contains(&self, ratio: f64) -> bool {
        !(ratio < self.lower || ratio > self.upper)
    }
}

/// The interval fitted to one group of units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HbInterval {
    pub median_ratio: f64,
    /// Lower percentile, median and upper percentile of the effects.
    pub quantiles: [f64; 3],
    /// Lower bound on the effect.
    pub lower_effect: f64,
    /// Upper bound on the effect.
    pub upper_effect: f64,
    pu: f64,
}

impl HbInterval {
    /// Fits the interval to paired values of the current and previous
    /// period. All values must be positive. Returns `None` for an empty
    /// group.
    pub fn fit(current: &[f64], previous: &[f64], parameters: &HbParameters) -> Option<Self> {
        let ratios: Vec<f64> = current.iter().zip(previous).map(|(c, p)| c / p).collect();
        let median_ratio = median(&ratios)?;

        let effects: Vec<f64> = ratios
            .iter()
            .zip(current.iter().zip(previous))
            .map(|(&ratio, (&c, &p))| {
                let centred = if ratio >= median_ratio {
                    ratio / median_ratio - 1.0
                } else {
                    1.0 - median_ratio / ratio
                };
                centred * c.max(p).powf(parameters.pu)
            })
            .collect();

        let (low, high) = parameters.percentiles;
        let [q1, q2, q3] = quantiles(&effects, [low, 0.5, high])?;

        let spread = if q2 != 0.0 {
            (q2 * parameters.pa).abs()
        } else {
            parameters.pa
        };
        let lower_effect = q2 - parameters.pc * (q2 - q1).max(spread);
        let upper_effect = q2 + parameters.pc * (q3 - q2).max(spread);

        Some(Self {
            median_ratio,
            quantiles: [q1, q2, q3],
            lower_effect,
            upper_effect,
            pu: parameters.pu,
        })
    }

    /// Limits for a unit with the given period values.
    pub fn limits(&self, current: f64, previous: f64) -> HbLimits {
        let size = current.max(previous).powf(self.pu);
        HbLimits {
            lower: self.median_ratio * size / (size - self.lower_effect),
            upper: self.median_ratio * (size + self.upper_effect) / size,
        }
    }
}

/// One unit (or unit within a stratum) with usable values in both periods.
#[derive(Debug, Clone)]
struct WideRow {
    id: String,
    stratum: Option<String>,
    previous: f64,
    current: f64,
    ratio: f64,
    limits: HbLimits,
    flag: i32,
}

/// Names and order of the columns of an HB result.
struct HbLayout<'a> {
    id_column: &'a str,
    strata_var: Option<&'a str>,
    time_var: &'a str,
    y_var: &'a str,
    flag_name: &'a str,
    periods: (String, String),
}

impl HbLayout<'_> {
    fn key_columns(&self, rows: &[&WideRow]) -> (Vec<Field>, Vec<ArrayRef>) {
        let mut fields = vec![Field::new(self.id_column, DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.id.as_str()),
        ))];
        if let Some(strata_var) = self.strata_var {
            fields.push(Field::new(strata_var, DataType::Utf8, true));
            columns.push(Arc::new(
                rows.iter()
                    .map(|row| row.stratum.as_deref())
                    .collect::<StringArray>(),
            ));
        }
        (fields, columns)
    }

    fn wide(&self, rows: &[&WideRow]) -> Result<RecordBatch> {
        let (mut fields, mut columns) = self.key_columns(rows);
        let float = |f: fn(&WideRow) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|row| f(row))))
        };

        fields.extend([
            Field::new(&self.periods.0, DataType::Float64, false),
            Field::new(&self.periods.1, DataType::Float64, false),
            Field::new("ratio", DataType::Float64, false),
            Field::new("lower_limit", DataType::Float64, false),
            Field::new("upper_limit", DataType::Float64, false),
            flag_field(self.flag_name),
        ]);
        columns.extend([
            float(|row| row.previous),
            float(|row| row.current),
            float(|row| row.ratio),
            float(|row| row.limits.lower),
            float(|row| row.limits.upper),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|row| row.flag))) as ArrayRef,
        ]);

        Ok(RecordBatch::try_new(result_schema(fields)?, columns)?)
    }

    /// All `t-1` rows, then all `t` rows. Test results are only attached to
    /// the `t` rows.
    fn long(&self, rows: &[&WideRow]) -> Result<RecordBatch> {
        let stacked: Vec<(&WideRow, bool)> = [false, true]
            .into_iter()
            .flat_map(|is_current| rows.iter().map(move |row| (*row, is_current)))
            .collect();
        let keys: Vec<&WideRow> = stacked.iter().map(|(row, _)| *row).collect();
        let (mut fields, mut columns) = self.key_columns(&keys);

        let tested = |f: fn(&WideRow) -> f64| -> ArrayRef {
            Arc::new(
                stacked
                    .iter()
                    .map(|&(row, is_current)| is_current.then(|| f(row)))
                    .collect::<Float64Array>(),
            )
        };
        let flags: Int32Array = stacked
            .iter()
            .map(|&(row, is_current)| is_current.then_some(row.flag))
            .collect();
        let periods = StringArray::from_iter_values(stacked.iter().map(|&(_, is_current)| {
            if is_current {
                self.periods.1.as_str()
            } else {
                self.periods.0.as_str()
            }
        }));
        let values = Float64Array::from_iter_values(stacked.iter().map(|&(row, is_current)| {
            if is_current {
                row.current
            } else {
                row.previous
            }
        }));

        fields.extend([
            Field::new("ratio", DataType::Float64, true),
            Field::new("lower_limit", DataType::Float64, true),
            Field::new("upper_limit", DataType::Float64, true),
            flag_field(self.flag_name),
            Field::new(self.time_var, DataType::Utf8, false),
            Field::new(self.y_var, DataType::Float64, false),
        ]);
        columns.extend([
            tested(|row| row.ratio),
            tested(|row| row.limits.lower),
            tested(|row| row.limits.upper),
            Arc::new(flags) as ArrayRef,
            Arc::new(periods) as ArrayRef,
            Arc::new(values) as ArrayRef,
        ]);

        Ok(RecordBatch::try_new(result_schema(fields)?, columns)?)
    }

    fn render(&self, format: HbOutput, rows: &[&WideRow]) -> Result<RecordBatch> {
        match format {
            HbOutput::Wide | HbOutput::Outliers => self.wide(rows),
            HbOutput::Long => self.long(rows),
        }
    }
}

/// Schema of an HB result. A flag or input column named like one of the
/// generated columns would otherwise appear twice.
fn result_schema(fields: Vec<Field>) -> Result<Arc<Schema>> {
    let mut seen = HashSet::new();
    if let Some(duplicate) = fields.iter().find(|field| !seen.insert(field.name())) {
        return Err(VaskError::configuration(format!(
            "HB result would contain the column '{}' twice",
            duplicate.name()
        )));
    }
    Ok(Arc::new(Schema::new(fields)))
}

impl Detector {
    /// Tests period-to-period ratios with the Hidiroglou-Berthelot method.
    ///
    /// The two periods are the lexically first two distinct values of
    /// `time_var` (after the optional [`HbOptions::time_periods`] filter).
    /// Only units with a positive value in both periods are tested. Data
    /// problems that prevent the test (not exactly two periods, no usable
    /// units) are logged as errors and give a possibly empty result rather
    /// than failing the call.
    ///
    /// # Errors
    ///
    /// Schema errors for missing or mistyped columns, and a configuration
    /// error for invalid percentiles.
    #[instrument(skip(self, options), fields(method = "hb", rows = self.data.num_rows()))]
    pub fn hb(&self, y_var: &str, time_var: &str, options: &HbOptions) -> Result<RecordBatch> {
        let strata_var = options.strata_var.as_deref().filter(|s| !s.is_empty());
        self.validate_columns(y_var, time_var, strata_var)?;
        let parameters = options.parameters();
        parameters.validate()?;

        let ids = string_column(&self.data, &self.id_column)?;
        let times = string_column(&self.data, time_var)?;
        let values = numeric_column(&self.data, y_var)?;
        let strata = strata_var
            .map(|column| string_column(&self.data, column))
            .transpose()?;

        let in_scope = |row: usize| match (&options.time_periods, label(&times, row)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some((a, b)), Some(t)) => t == a || t == b,
        };

        let levels: BTreeSet<&str> = (0..times.len())
            .filter(|&row| in_scope(row))
            .filter_map(|row| label(&times, row))
            .collect();
        if levels.len() != 2 {
            self.diagnose(
                LogLevel::Error,
                DiagnosticKind::DataQuality,
                "The time variable must have exactly two unique levels.",
            );
        }

        let mut layout = HbLayout {
            id_column: &self.id_column,
            strata_var,
            time_var,
            y_var,
            flag_name: &options.flag_name,
            periods: ("previous".to_string(), "current".to_string()),
        };

        let mut levels = levels.into_iter();
        let (Some(time0), Some(time1)) = (levels.next(), levels.next()) else {
            return layout.render(options.output_format, &[]);
        };
        layout.periods = (time0.to_string(), time1.to_string());

        // first non-missing value per (unit, stratum) and period
        let mut cells: BTreeMap<(&str, Option<&str>), [Option<f64>; 2]> = BTreeMap::new();
        for row in (0..times.len()).filter(|&row| in_scope(row)) {
            let slot = match label(&times, row) {
                Some(t) if t == time0 => 0,
                Some(t) if t == time1 => 1,
                _ => continue,
            };
            let Some(id) = label(&ids, row) else {
                continue;
            };
            let stratum = match &strata {
                Some(strata) => match label(strata, row) {
                    Some(stratum) => Some(stratum),
                    None => continue,
                },
                None => None,
            };
            let cell = &mut cells.entry((id, stratum)).or_default()[slot];
            if cell.is_none() {
                *cell = number(&values, row);
            }
        }

        let mut rows: Vec<WideRow> = cells
            .into_iter()
            .filter_map(|((id, stratum), [previous, current])| match (previous, current) {
                (Some(previous), Some(current)) if previous > 0.0 && current > 0.0 => {
                    Some(WideRow {
                        id: id.to_string(),
                        stratum: stratum.map(str::to_string),
                        previous,
                        current,
                        ratio: current / previous,
                        limits: HbLimits {
                            lower: f64::NAN,
                            upper: f64::NAN,
                        },
                        flag: 0,
                    })
                }
                _ => None,
            })
            .collect();

        if rows.is_empty() {
            self.diagnose(
                LogLevel::Error,
                DiagnosticKind::DataQuality,
                "No valid rows with y_var > 0 for both time periods.",
            );
            return layout.render(options.output_format, &[]);
        }

        let mut groups: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
        for (index, row) in rows.iter().enumerate() {
            groups.entry(row.stratum.clone()).or_default().push(index);
        }

        for (stratum, members) in &groups {
            let current: Vec<f64> = members.iter().map(|&i| rows[i].current).collect();
            let previous: Vec<f64> = members.iter().map(|&i| rows[i].previous).collect();
            let Some(interval) = HbInterval::fit(&current, &previous, &parameters) else {
                continue;
            };
            self.diagnose(
                LogLevel::Debug,
                DiagnosticKind::Progress,
                format!(
                    "HB interval for {}: {} units, median ratio {:.4}, effect bounds [{:.4}, {:.4}]",
                    stratum.as_deref().unwrap_or("all units"),
                    members.len(),
                    interval.median_ratio,
                    interval.lower_effect,
                    interval.upper_effect,
                ),
            );

            for &i in members {
                let row = &mut rows[i];
                row.limits = interval.limits(row.current, row.previous);
                row.flag = i32::from(!row.limits.contains(row.ratio));
            }
        }

        let flagged: Vec<&WideRow> = rows.iter().filter(|row| row.flag == 1).collect();
        debug!(units = rows.len(), flagged = flagged.len(), "HB limits computed");

        match options.output_format {
            HbOutput::Outliers => {
                if flagged.is_empty() {
                    self.diagnose(LogLevel::Info, DiagnosticKind::Progress, "No outliers detected");
                }
                layout.wide(&flagged)
            }
            format => {
                let all: Vec<&WideRow> = rows.iter().collect();
                layout.render(format, &all)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingSink;
    use crate::test_fixtures::{hb_panel, small_panel};
    use arrow::array::AsArray;
    use arrow::datatypes::{Float64Type, Int32Type};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn detector(batch: RecordBatch, sink: Arc<RecordingSink>) -> Detector {
        Detector::builder(batch, "unit_id")
            .log_level(LogLevel::Info)
            .sink(sink)
            .build()
            .unwrap()
    }

    fn floats(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
        batch
            .column_by_name(name)
            .unwrap()
            .as_primitive::<Float64Type>()
            .iter()
            .collect()
    }

    fn flags(batch: &RecordBatch) -> Vec<Option<i32>> {
        batch
            .column_by_name("flag_hb")
            .unwrap()
            .as_primitive::<Int32Type>()
            .iter()
            .collect()
    }

    fn column_names(batch: &RecordBatch) -> Vec<String> {
        batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    #[test]
    fn test_interval_with_zero_median_effect() {
        let previous = [100.0, 200.0, 150.0, 300.0, 120.0, 250.0, 180.0, 400.0, 220.0, 160.0];
        let current = [105.0, 210.0, 160.0, 290.0, 126.0, 260.0, 190.0, 420.0, 2200.0, 150.0];
        let interval = HbInterval::fit(&current, &previous, &HbParameters::default()).unwrap();

        assert_close(interval.median_ratio, 1.05);
        assert_close(interval.quantiles[0], -0.11628256367738252);
        assert_eq!(interval.quantiles[1], 0.0);
        assert_close(interval.quantiles[2], 0.05469860615908875);
        assert_close(interval.lower_effect, -2.3256512735476504);
        assert_close(interval.upper_effect, 1.093972123181775);

        let limits = interval.limits(105.0, 100.0);
        assert_close(limits.lower, 0.8557733928464709);
        assert_close(limits.upper, 1.1620987848557596);

        let limits = interval.limits(2200.0, 220.0);
        assert_close(limits.lower, 1.0003972513160675);
        assert_close(limits.upper, 1.0744897422352195);
        assert!(!limits.contains(10.0));
    }

    #[test]
    fn test_interval_with_nonzero_median_effect() {
        let previous = [100.0, 200.0, 100.0, 200.0];
        let current = [110.0, 240.0, 140.0, 400.0];
        let interval = HbInterval::fit(&current, &previous, &HbParameters::default()).unwrap();

        assert_close(interval.median_ratio, 1.3);
        assert_close(interval.quantiles[1], -0.1904141641294692);
        assert_close(interval.lower_effect, -25.281673505033066);
        assert_close(interval.upper_effect, 71.11651477176679);

        let limits = interval.limits(400.0, 200.0);
        assert_close(limits.lower, 0.5741837257209605);
        assert_close(limits.upper, 5.92257346016484);
    }

    #[test]
    fn test_interval_respects_parameters() {
        let previous = [100.0, 200.0, 100.0, 300.0, 100.0];
        let current = [110.0, 250.0, 90.0, 400.0, 130.0];
        let parameters = HbParameters {
            pc: 4.0,
            percentiles: (0.1, 0.9),
            ..HbParameters::default()
        };
        let interval = HbInterval::fit(&current, &previous, &parameters).unwrap();

        assert_close(interval.lower_effect, -11.621643547522751);
        assert_close(interval.upper_effect, 3.9297122720634485);
        let limits = interval.limits(130.0, 100.0);
        assert_close(limits.lower, 0.6190308197975463);
        assert_close(limits.upper, 1.6808232077228118);
    }

    #[test]
    fn test_wide_output_flags_tenfold_growth() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();
        let wide = detector.hb("turnover", "year", &HbOptions::default()).unwrap();

        assert_eq!(
            column_names(&wide),
            vec!["unit_id", "2023", "2024", "ratio", "lower_limit", "upper_limit", "flag_hb"]
        );
        assert_eq!(wide.num_rows(), 10);

        let mut expected = vec![Some(0); 10];
        expected[8] = Some(1);
        assert_eq!(flags(&wide), expected);

        let ids = wide.column(0).as_string::<i32>();
        assert_eq!(ids.value(0), "u01");
        assert_eq!(ids.value(8), "u09");
        assert_eq!(floats(&wide, "ratio")[8], Some(10.0));
        assert_close(floats(&wide, "lower_limit")[0].unwrap(), 0.8557733928464709);
    }

    #[test]
    fn test_stratified_limits_are_computed_per_stratum() {
        let sink = Arc::new(RecordingSink::new());
        let detector = detector(hb_panel().unwrap(), sink.clone());
        let options = HbOptions::default().with_strata("region");
        let wide = detector.hb("turnover", "year", &options).unwrap();

        assert_eq!(column_names(&wide)[1], "region");
        assert_eq!(wide.num_rows(), 10);
        assert_eq!(flags(&wide), vec![Some(0); 10]);

        let lower = floats(&wide, "lower_limit");
        let upper = floats(&wide, "upper_limit");
        assert_close(upper[0].unwrap(), 1.152469507659596);
        assert_close(lower[6].unwrap(), 0.6535372260329497);
        assert_close(upper[8].unwrap(), 45.80493931342238);

        let outliers = detector
            .hb(
                "turnover",
                "year",
                &options.with_output_format(HbOutput::Outliers),
            )
            .unwrap();
        assert_eq!(outliers.num_rows(), 0);
        assert!(sink.contains("No outliers detected"));
    }

    #[test]
    fn test_long_output_stacks_periods() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();
        let options = HbOptions::default().with_output_format(HbOutput::Long);
        let long = detector.hb("turnover", "year", &options).unwrap();

        assert_eq!(
            column_names(&long),
            vec![
                "unit_id",
                "ratio",
                "lower_limit",
                "upper_limit",
                "flag_hb",
                "year",
                "turnover"
            ]
        );
        assert_eq!(long.num_rows(), 20);

        let years = long.column_by_name("year").unwrap().as_string::<i32>();
        assert_eq!(years.value(0), "2023");
        assert_eq!(years.value(10), "2024");

        let ratio = long.column_by_name("ratio").unwrap();
        assert_eq!(ratio.null_count(), 10);
        assert!(ratio.is_null(8));
        assert_eq!(flags(&long)[18], Some(1));
        assert_eq!(floats(&long, "turnover")[8], Some(220.0));
        assert_eq!(floats(&long, "turnover")[18], Some(2200.0));
    }

    #[test]
    fn test_outliers_output() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();
        let options = HbOptions::default().with_output_format(HbOutput::Outliers);
        let outliers = detector.hb("turnover", "year", &options).unwrap();

        assert_eq!(outliers.num_rows(), 1);
        assert_eq!(outliers.column(0).as_string::<i32>().value(0), "u09");
    }

    #[test]
    fn test_more_than_two_periods_uses_first_two() {
        let sink = Arc::new(RecordingSink::new());
        let detector = detector(small_panel().unwrap(), sink.clone());
        let wide = detector
            .hb("turnover", "time_period", &HbOptions::default())
            .unwrap();

        assert!(sink.contains("The time variable must have exactly two unique levels."));
        assert_eq!(column_names(&wide)[1..3], ["2020-01", "2020-02"]);
        // unit 3 has no 2020-02 value
        assert_eq!(wide.num_rows(), 2);
    }

    #[test]
    fn test_time_period_filter() {
        let sink = Arc::new(RecordingSink::new());
        let detector = detector(small_panel().unwrap(), sink.clone());
        let options = HbOptions::default().with_time_periods("2020-02", "2020-03");
        let wide = detector.hb("turnover", "time_period", &options).unwrap();

        assert!(sink.diagnostics().is_empty());
        assert_eq!(column_names(&wide)[1..3], ["2020-02", "2020-03"]);
        assert_eq!(floats(&wide, "2020-03"), vec![Some(110_000.0), Some(0.4)]);
    }

    #[test]
    fn test_single_period_gives_empty_result() {
        let sink = Arc::new(RecordingSink::new());
        let detector = detector(small_panel().unwrap(), sink.clone());
        let options = HbOptions::default()
            .with_time_periods("2020-01", "2031-01")
            .with_output_format(HbOutput::Long);
        let long = detector.hb("turnover", "time_period", &options).unwrap();

        assert_eq!(long.num_rows(), 0);
        assert_eq!(long.num_columns(), 7);
        let errors = sink.of_kind(DiagnosticKind::DataQuality);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].level, LogLevel::Error);
    }

    #[test]
    fn test_no_positive_pairs_gives_empty_result() {
        let sink = Arc::new(RecordingSink::new());
        let detector = detector(small_panel().unwrap(), sink.clone());
        let options = HbOptions::default().with_time_periods("2020-02", "2020-03");
        let negated = {
            let values = numeric_column(detector.data(), "turnover").unwrap();
            let negated: Float64Array = values.iter().map(|v| v.map(|v| -v)).collect();
            crate::panel::with_column(
                detector.data(),
                Field::new("turnover", DataType::Float64, true),
                Arc::new(negated),
            )
            .unwrap()
        };
        let detector = Detector::builder(negated, "unit_id")
            .sink(sink.clone())
            .build()
            .unwrap();
        let wide = detector.hb("turnover", "time_period", &options).unwrap();

        assert_eq!(wide.num_rows(), 0);
        assert!(sink.contains("No valid rows with y_var > 0 for both time periods."));
    }

    #[test]
    fn test_invalid_percentiles_are_rejected() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();
        for percentiles in [(-0.1, 0.75), (0.25, 1.5), (0.8, 0.2), (f64::NAN, 0.5)] {
            let options = HbOptions::default().with_percentiles(percentiles.0, percentiles.1);
            let err = detector.hb("turnover", "year", &options).unwrap_err();
            assert!(matches!(err, VaskError::Configuration(_)), "{percentiles:?}");
        }
    }

    #[test]
    fn test_flag_name_colliding_with_result_columns() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();

        let long = HbOptions::default()
            .with_flag_name("turnover")
            .with_output_format(HbOutput::Long);
        let err = detector.hb("turnover", "year", &long).unwrap_err();
        assert!(
            matches!(err, VaskError::Configuration(ref msg) if msg.contains("'turnover'")),
            "{err}"
        );

        let err = detector
            .hb("turnover", "year", &HbOptions::default().with_flag_name("ratio"))
            .unwrap_err();
        assert!(matches!(err, VaskError::Configuration(_)));

        // the wide layout has no column named after the target
        let wide = detector
            .hb("turnover", "year", &HbOptions::default().with_flag_name("turnover"))
            .unwrap();
        assert_eq!(wide.schema().fields().last().unwrap().name(), "turnover");
    }

    #[test]
    fn test_missing_strata_column() {
        let detector = Detector::new(hb_panel().unwrap(), "unit_id").unwrap();
        let options = HbOptions::default().with_strata("industry");
        let err = detector.hb("turnover", "year", &options).unwrap_err();
        assert_eq!(err.as_schema().map(|e| e.column()), Some("industry"));
    }

    #[test]
    fn test_options_from_json() {
        let options: HbOptions = serde_json::from_str(
            r#"{"strata_var": "region", "pc": 4.0, "time_periods": ["2023", "2024"]}"#,
        )
        .unwrap();
        assert_eq!(options.strata_var.as_deref(), Some("region"));
        assert_eq!(options.pc, 4.0);
        assert_eq!(options.pu, 0.5);
        assert_eq!(
            options.time_periods,
            Some(("2023".to_string(), "2024".to_string()))
        );
        assert_eq!(options.output_format, HbOutput::Wide);
    }
}
