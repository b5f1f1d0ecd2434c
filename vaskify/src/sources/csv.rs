//! CSV file source.

use super::{cast_to_utf8, collect_single, extension_of, PanelSource};
use crate::error::{Result, VaskError};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use tracing::{debug, instrument};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Schema to use (if None, will be inferred)
    pub schema: Option<SchemaRef>,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
    /// Columns read back as `Utf8` after loading. Inference turns labels
    /// such as `"42"` or `"2024"` into integers, which the detectors reject
    /// as identifiers and periods.
    pub string_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            schema: None,
            schema_infer_max_records: 1000,
            string_columns: Vec::new(),
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_string_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// A CSV file holding a long-format panel.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: String,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: impl Into<String>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }
}

#[async_trait]
impl PanelSource for CsvSource {
    #[instrument(skip(self, ctx), fields(source.type = "csv", source.path = %self.path))]
    async fn load(&self, ctx: &SessionContext) -> Result<RecordBatch> {
        let extension = extension_of(&self.path);
        let mut read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(&extension);
        if let Some(schema) = &self.options.schema {
            read_options = read_options.schema(schema);
        }

        let frame = ctx.read_csv(self.path.as_str(), read_options).await.map_err(|e| {
            VaskError::data_source_with_source("CSV", format!("failed to read {}", self.path), Box::new(e))
        })?;
        let batch = collect_single(frame).await?;
        debug!(rows = batch.num_rows(), columns = batch.num_columns(), "CSV panel loaded");

        cast_to_utf8(batch, &self.options.string_columns)
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path)
    }
}
