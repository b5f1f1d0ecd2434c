//! Loading panels into memory.
//!
//! Detection runs on a single materialised [`RecordBatch`]. Sources read a
//! file through a DataFusion [`SessionContext`], collect every batch and
//! concatenate them.
//!
//! ```rust,ignore
//! use vaskify::sources::{CsvOptions, CsvSource};
//!
//! let ctx = SessionContext::new();
//! let source = CsvSource::with_options(
//!     "survey.csv",
//!     CsvOptions::default().with_string_columns(["unit_id", "time_period"]),
//! );
//! let detector = Detector::from_source(&source, &ctx, "unit_id").await?;
//! ```

mod csv;
mod memory;
mod parquet;

pub use csv::{CsvOptions, CsvSource};
pub use memory::MemorySource;
pub use parquet::ParquetSource;

use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::path::Path;

use crate::error::{ErrorContext, Result};
use crate::panel::{column, with_column};

/// A place a panel can be loaded from.
#[async_trait]
pub trait PanelSource: Debug + Send + Sync {
    /// Reads the whole panel as one batch.
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatch>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Executes `frame` and concatenates its batches.
async fn collect_single(frame: DataFrame) -> Result<RecordBatch> {
    let schema = frame.schema().inner().clone();
    let batches = frame.collect().await?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Casts the named columns to `Utf8`.
fn cast_to_utf8(batch: RecordBatch, columns: &[String]) -> Result<RecordBatch> {
    columns.iter().try_fold(batch, |batch, name| {
        let array = column(&batch, name)?;
        if array.data_type() == &DataType::Utf8 {
            return Ok(batch);
        }
        let utf8 = cast(array, &DataType::Utf8)
            .with_context(|| format!("casting column '{name}' to Utf8"))?;
        with_column(&batch, Field::new(name, DataType::Utf8, true), utf8)
    })
}

/// File extension of `path` with its leading dot, or an empty string.
fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{AsArray, Int64Array};
    use arrow::datatypes::Schema;
    use std::sync::Arc;

    #[test]
    fn test_cast_to_utf8() {
        let schema = Arc::new(Schema::new(vec![Field::new("year", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![2020, 2021]))])
                .unwrap();

        let cast = cast_to_utf8(batch, &["year".to_string()]).unwrap();
        assert_eq!(cast.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(cast.column(0).as_string::<i32>().value(1), "2021");
    }

    #[test]
    fn test_cast_missing_column() {
        let schema = Arc::new(Schema::new(vec![Field::new("year", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![2020]))]).unwrap();
        let err = cast_to_utf8(batch, &["unit_id".to_string()]).unwrap_err();
        assert!(err.as_schema().is_some());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("data/panel.csv"), ".csv");
        assert_eq!(extension_of("panel.tsv"), ".tsv");
        assert_eq!(extension_of("panel"), "");
    }
}
