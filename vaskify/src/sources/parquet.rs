//! Parquet file source.

use super::{cast_to_utf8, collect_single, PanelSource};
use crate::error::{Result, VaskError};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use tracing::{debug, instrument};

/// A Parquet file holding a long-format panel.
#[derive(Debug, Clone)]
pub struct ParquetSource {
    path: String,
    string_columns: Vec<String>,
}

impl ParquetSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            string_columns: Vec::new(),
        }
    }

    /// Casts the named columns to `Utf8` after loading.
    pub fn with_string_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl PanelSource for ParquetSource {
    #[instrument(skip(self, ctx), fields(source.type = "parquet", source.path = %self.path))]
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatch> {
        let frame = ctx
            .read_parquet(self.path.as_str(), ParquetReadOptions::default())
            .await
            .map_err(|e| {
                VaskError::data_source_with_source(
                    "Parquet",
                    format!("failed to read {}", self.path),
                    Box::new(e),
                )
            })?;
        let batch = collect_single(frame).await?;
        debug!(rows = batch.num_rows(), "Parquet panel loaded");

        cast_to_utf8(batch, &self.string_columns)
    }

    fn description(&self) -> String {
        format!("Parquet file: {}", self.path)
    }
}
