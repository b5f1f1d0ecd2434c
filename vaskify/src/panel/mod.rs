//! Column access and per-unit ordering over long-format panel batches.
//!
//! A panel is a plain Arrow [`RecordBatch`] with one row per unit per period.
//! The helpers here read typed columns, sort a batch on
//! `(unit, period)` and split the sorted rows into per-unit spans, which is
//! all the detectors need from the table layer.

mod period;

pub use period::{is_valid_period, PeriodFormat};

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, StringArray, UInt32Array};
use arrow::compute::{cast, filter_record_batch, take_record_batch};
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, SchemaError};

/// Returns true for the Arrow string types a panel may use for labels.
pub fn is_string_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

/// Looks up a column by name.
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(name).ok_or_else(|| {
        SchemaError::MissingColumn {
            column: name.to_string(),
        }
        .into()
    })
}

/// Reads a label column as `Utf8`, casting from any other string or
/// primitive type.
pub fn string_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let array = column(batch, name)?;
    let utf8 = cast(array, &DataType::Utf8)?;
    Ok(utf8.as_string::<i32>().clone())
}

/// Reads a numeric column as `Float64`.
pub fn numeric_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = column(batch, name)?;
    let values = cast(array, &DataType::Float64)?;
    Ok(values.as_primitive::<Float64Type>().clone())
}

/// Reads value `i` of a string array, mapping nulls to `None`.
pub(crate) fn label(array: &StringArray, i: usize) -> Option<&str> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}

/// Reads value `i` of a float array, mapping nulls and NaN to `None`.
pub(crate) fn number(array: &Float64Array, i: usize) -> Option<f64> {
    if array.is_null(i) {
        return None;
    }
    let value = array.value(i);
    (!value.is_nan()).then_some(value)
}

/// Orders labels lexically with nulls last.
fn cmp_labels(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A contiguous run of rows that belong to one unit in a sorted panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpan {
    /// Unit identifier; `None` for rows with a null identifier, which never
    /// share a span.
    pub id: Option<String>,
    pub start: usize,
    pub len: usize,
}

impl UnitSpan {
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// A panel sorted on `(unit, period)` with its unit spans.
#[derive(Debug, Clone)]
pub struct SortedPanel {
    batch: RecordBatch,
    ids: StringArray,
    spans: Vec<UnitSpan>,
}

impl SortedPanel {
    /// Stable-sorts `batch` on `(id_column, time_column)` in lexical order,
    /// nulls last.
    pub fn sort(batch: &RecordBatch, id_column: &str, time_column: &str) -> Result<Self> {
        let ids = string_column(batch, id_column)?;
        let times = string_column(batch, time_column)?;

        let mut indices: Vec<u32> = (0..batch.num_rows() as u32).collect();
        indices.sort_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            cmp_labels(label(&ids, a), label(&ids, b))
                .then_with(|| cmp_labels(label(&times, a), label(&times, b)))
        });

        let sorted = take_record_batch(batch, &UInt32Array::from(indices))?;
        let ids = string_column(&sorted, id_column)?;
        let spans = unit_spans(&ids);

        Ok(Self {
            batch: sorted,
            ids,
            spans,
        })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn spans(&self) -> &[UnitSpan] {
        &self.spans
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Identifier of row `i`.
    pub fn id(&self, i: usize) -> Option<&str> {
        label(&self.ids, i)
    }
}

fn unit_spans(ids: &StringArray) -> Vec<UnitSpan> {
    let mut spans: Vec<UnitSpan> = Vec::new();
    for i in 0..ids.len() {
        let id = label(ids, i);
        match (spans.last_mut(), id) {
            (Some(last), Some(id)) if last.id.as_deref() == Some(id) => last.len += 1,
            _ => spans.push(UnitSpan {
                id: id.map(str::to_string),
                start: i,
                len: 1,
            }),
        }
    }
    spans
}

/// Returns `batch` with `array` as column `field`, replacing an existing
/// column of the same name in place or appending it at the end.
pub fn with_column(batch: &RecordBatch, field: Field, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    match schema.index_of(field.name()) {
        Ok(index) => {
            fields[index] = field;
            columns[index] = array;
        }
        Err(_) => {
            fields.push(field);
            columns.push(array);
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Keeps the rows whose unit identifier is in `units`.
pub fn filter_units(
    batch: &RecordBatch,
    id_column: &str,
    units: &HashSet<String>,
) -> Result<RecordBatch> {
    let ids = string_column(batch, id_column)?;
    let mask: BooleanArray = (0..ids.len())
        .map(|i| Some(label(&ids, i).is_some_and(|id| units.contains(id))))
        .collect();
    Ok(filter_record_batch(batch, &mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};

    fn unsorted_panel() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("unit_id", DataType::Utf8, true),
            Field::new("time_period", DataType::Utf8, false),
            Field::new("turnover", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![
                    Some("b"),
                    None,
                    Some("a"),
                    Some("b"),
                    Some("a"),
                ])),
                Arc::new(StringArray::from(vec![
                    "2020-02", "2020-01", "2020-02", "2020-01", "2020-01",
                ])),
                Arc::new(Int64Array::from(vec![Some(4), Some(5), Some(2), Some(3), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_sort_orders_by_unit_then_period() {
        let sorted = SortedPanel::sort(&unsorted_panel(), "unit_id", "time_period").unwrap();
        let times = string_column(sorted.batch(), "time_period").unwrap();
        let ids: Vec<Option<&str>> = (0..sorted.num_rows()).map(|i| sorted.id(i)).collect();

        assert_eq!(ids, vec![Some("a"), Some("a"), Some("b"), Some("b"), None]);
        assert_eq!(times.value(0), "2020-01");
        assert_eq!(times.value(1), "2020-02");
        assert_eq!(times.value(2), "2020-01");
    }

    #[test]
    fn test_unit_spans() {
        let sorted = SortedPanel::sort(&unsorted_panel(), "unit_id", "time_period").unwrap();
        let spans = sorted.spans();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].id.as_deref(), Some("a"));
        assert_eq!(spans[0].rows(), 0..2);
        assert_eq!(spans[1].rows(), 2..4);
        assert_eq!(spans[2].id, None);
    }

    #[test]
    fn test_numeric_column_reads_nulls_as_missing() {
        let batch = unsorted_panel();
        let values = numeric_column(&batch, "turnover").unwrap();
        assert_eq!(number(&values, 0), Some(4.0));
        assert_eq!(number(&values, 4), None);
    }

    #[test]
    fn test_missing_column() {
        let err = column(&unsorted_panel(), "employees").unwrap_err();
        assert_eq!(
            err.as_schema(),
            Some(&SchemaError::MissingColumn {
                column: "employees".to_string()
            })
        );
    }

    #[test]
    fn test_with_column_replaces_existing() {
        let batch = unsorted_panel();
        let replaced = with_column(
            &batch,
            Field::new("turnover", DataType::Float64, true),
            Arc::new(Float64Array::from(vec![1.0; 5])),
        )
        .unwrap();
        assert_eq!(replaced.num_columns(), 3);
        assert_eq!(
            replaced.schema().field(2).data_type(),
            &DataType::Float64
        );

        let appended = with_column(
            &batch,
            Field::new("flag", DataType::Float64, true),
            Arc::new(Float64Array::from(vec![0.0; 5])),
        )
        .unwrap();
        assert_eq!(appended.num_columns(), 4);
    }

    #[test]
    fn test_filter_units() {
        let batch = unsorted_panel();
        let units: HashSet<String> = ["b".to_string()].into_iter().collect();
        let filtered = filter_units(&batch, "unit_id", &units).unwrap();
        assert_eq!(filtered.num_rows(), 2);
    }
}
