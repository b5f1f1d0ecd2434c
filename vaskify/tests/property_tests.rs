//! Property-based tests for the detectors.
//!
//! Each property builds a panel from generated values, computes the expected
//! flags independently and compares them with what the detector returns.
//! Row order of the input must never change a flag, so several properties
//! shuffle the panel before detection.

use arrow::array::{AsArray, Float64Array, StringArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field, Float64Type, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use proptest::prelude::*;
use std::sync::Arc;
use vaskify::detect::{AccumulationErrorOptions, Detector, HbOptions, ThousandErrorOptions};
use vaskify::testdata::{generate_panel, PeriodGranularity};

/// A single-unit yearly panel starting in 2020.
fn unit_series(values: &[f64]) -> RecordBatch {
    let periods = PeriodGranularity::Yearly.periods(values.len()).unwrap();
    let schema = Arc::new(Schema::new(vec![
        Field::new("unit_id", DataType::Utf8, false),
        Field::new("time_period", DataType::Utf8, false),
        Field::new("turnover", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["u"; values.len()])),
            Arc::new(StringArray::from(periods)),
            Arc::new(Float64Array::from(values.to_vec())),
        ],
    )
    .unwrap()
}

/// Reorders rows by sorting on the generated keys.
fn shuffle(batch: &RecordBatch, keys: &[u32]) -> RecordBatch {
    let mut order: Vec<u32> = (0..batch.num_rows() as u32).collect();
    order.sort_by_key(|&row| keys[row as usize % keys.len()].wrapping_add(row.wrapping_mul(7919)));
    take_record_batch(batch, &UInt32Array::from(order)).unwrap()
}

fn flag_values(batch: &RecordBatch, name: &str) -> Vec<Option<i32>> {
    batch
        .column_by_name(name)
        .unwrap()
        .as_primitive::<Int32Type>()
        .iter()
        .collect()
}

proptest! {
    /// A step is flagged when its log10 change leaves the bounds.
    ///
    /// Properties tested:
    /// - The first period is never tested
    /// - Every later step is flagged exactly when it is outside `[lower, upper]`
    #[test]
    fn test_thousand_flag_rule(
        exponents in prop::collection::vec(-2.0f64..8.0, 2..12),
        width in 0.5f64..4.0
    ) {
        let values: Vec<f64> = exponents.iter().map(|e| 10f64.powf(*e)).collect();
        let detector = Detector::new(unit_series(&values), "unit_id").unwrap();
        let options = ThousandErrorOptions::default().with_bounds(-width, width);
        let result = detector.thousand_error("turnover", "time_period", &options).unwrap();
        let flags = flag_values(&result, "flag_thousand");

        prop_assert_eq!(flags[0], None);
        for step in 1..values.len() {
            let diff = values[step].log10() - values[step - 1].log10();
            let expected = i32::from(diff < -width || diff > width);
            prop_assert_eq!(flags[step], Some(expected), "step {}", step);
        }
    }

    /// A step is flagged when the value grows past `(1 + error)` times the previous one.
    #[test]
    fn test_accumulation_flag_rule(
        values in prop::collection::vec(1.0f64..1_000.0, 2..12),
        error in 0.0f64..2.0
    ) {
        let detector = Detector::new(unit_series(&values), "unit_id").unwrap();
        let options = AccumulationErrorOptions::default().with_error(error);
        let result = detector.accumulation_error("turnover", "time_period", &options).unwrap();
        let flags = flag_values(&result, "flag_accumulation");

        prop_assert_eq!(flags[0], None);
        for step in 1..values.len() {
            let expected = i32::from(values[step] > values[step - 1] * (1.0 + error));
            prop_assert_eq!(flags[step], Some(expected), "step {}", step);
        }
    }

    /// Shuffling the input rows leaves the period-to-period results unchanged.
    #[test]
    fn test_row_order_does_not_matter(
        seed in any::<u64>(),
        units in 1usize..15,
        periods in 2usize..6,
        keys in prop::collection::vec(any::<u32>(), 1..64)
    ) {
        let panel = generate_panel(units, periods, PeriodGranularity::Quarterly, seed).unwrap();
        let shuffled = shuffle(&panel, &keys);

        let ordered = Detector::new(panel, "unit_id").unwrap();
        let reordered = Detector::new(shuffled, "unit_id").unwrap();

        let options = ThousandErrorOptions::default().with_impute(true);
        prop_assert_eq!(
            ordered.thousand_error("turnover", "time_period", &options).unwrap(),
            reordered.thousand_error("turnover", "time_period", &options).unwrap()
        );
        let options = AccumulationErrorOptions::default();
        prop_assert_eq!(
            ordered.accumulation_error("turnover", "time_period", &options).unwrap(),
            reordered.accumulation_error("turnover", "time_period", &options).unwrap()
        );
    }

    /// HB flags agree with the reported limits and the row order of the input.
    ///
    /// Properties tested:
    /// - One wide row per unit with positive values in both periods
    /// - `flag == 1` exactly when the ratio is outside `[lower_limit, upper_limit]`
    /// - Shuffling the input gives the same wide result
    #[test]
    fn test_hb_flags_follow_limits(
        seed in any::<u64>(),
        units in 1usize..40,
        pc in 1.0f64..40.0,
        keys in prop::collection::vec(any::<u32>(), 1..64)
    ) {
        let panel = generate_panel(units, 2, PeriodGranularity::Monthly, seed).unwrap();
        let shuffled = shuffle(&panel, &keys);
        let options = HbOptions::default().with_pc(pc);

        let wide = Detector::new(panel, "unit_id")
            .unwrap()
            .hb("turnover", "time_period", &options)
            .unwrap();
        prop_assert_eq!(wide.num_rows(), units);

        let ratio = wide.column_by_name("ratio").unwrap().as_primitive::<Float64Type>();
        let lower = wide.column_by_name("lower_limit").unwrap().as_primitive::<Float64Type>();
        let upper = wide.column_by_name("upper_limit").unwrap().as_primitive::<Float64Type>();
        let flags = flag_values(&wide, "flag_hb");
        for row in 0..wide.num_rows() {
            let outside = ratio.value(row) < lower.value(row) || ratio.value(row) > upper.value(row);
            prop_assert_eq!(flags[row], Some(i32::from(outside)));
        }

        let reordered = Detector::new(shuffled, "unit_id")
            .unwrap()
            .hb("turnover", "time_period", &options)
            .unwrap();
        prop_assert_eq!(reordered, wide);
    }
}

#[cfg(test)]
mod edge_case_tests {
    use super::*;

    #[test]
    fn test_single_period_units_are_never_flagged() {
        let detector = Detector::new(unit_series(&[1_000_000.0]), "unit_id").unwrap();
        let thousand = detector
            .thousand_error("turnover", "time_period", &ThousandErrorOptions::default())
            .unwrap();
        assert_eq!(flag_values(&thousand, "flag_thousand"), vec![None]);

        let accumulation = detector
            .accumulation_error("turnover", "time_period", &AccumulationErrorOptions::default())
            .unwrap();
        assert_eq!(flag_values(&accumulation, "flag_accumulation"), vec![None]);
    }

    #[test]
    fn test_exact_factor_of_thousand_is_flagged() {
        let detector = Detector::new(unit_series(&[2.0, 2_000.0, 2.0]), "unit_id").unwrap();
        let result = detector
            .thousand_error("turnover", "time_period", &ThousandErrorOptions::default())
            .unwrap();
        assert_eq!(
            flag_values(&result, "flag_thousand"),
            vec![None, Some(1), Some(1)]
        );
    }

    #[test]
    fn test_growth_at_threshold_is_not_flagged() {
        let detector = Detector::new(unit_series(&[100.0, 150.0, 226.0]), "unit_id").unwrap();
        let result = detector
            .accumulation_error("turnover", "time_period", &AccumulationErrorOptions::default())
            .unwrap();
        assert_eq!(
            flag_values(&result, "flag_accumulation"),
            vec![None, Some(0), Some(1)]
        );
    }
}
