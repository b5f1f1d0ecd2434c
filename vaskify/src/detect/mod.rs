//! The detection engine.
//!
//! A [`Detector`] holds an immutable snapshot of a long-format panel and the
//! name of its unit identifier column. Each detection method validates the
//! columns it needs, works on its own sorted copy of the snapshot and returns
//! a new [`RecordBatch`]:
//!
//! - [`Detector::thousand_error`] flags values off by a factor of about 1000
//!   from the previous period.
//! - [`Detector::accumulation_error`] flags values that grew implausibly from
//!   the previous period.
//! - [`Detector::hb`] applies the Hidiroglou-Berthelot method to two periods,
//!   optionally per stratum.
//!
//! # Examples
//!
//! ```rust,ignore
//! use vaskify::detect::{Detector, HbOptions};
//!
//! let detector = Detector::new(batch, "unit_id")?;
//! let wide = detector.hb("turnover", "time_period", &HbOptions::default())?;
//! ```

mod accumulation;
mod hb;
mod output;
pub mod stats;
mod thousand;

pub use accumulation::AccumulationErrorOptions;
pub use hb::{HbInterval, HbLimits, HbOptions, HbParameters};
pub use output::{DataOutput, HbOutput, OutputFormat};
pub use thousand::ThousandErrorOptions;

use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::logging::{Diagnostic, DiagnosticKind, DiagnosticSink, LogLevel, TracingSink};
use crate::sources::PanelSource;
use crate::validation::SchemaValidator;

/// Runs thousand-error, accumulation-error and HB detection over one panel.
///
/// The detector is `Send + Sync`; detection methods take `&self` and never
/// touch the stored snapshot, so one detector can serve several threads.
/// Changing the log level needs `&mut self`.
pub struct Detector {
    data: Arc<RecordBatch>,
    id_column: String,
    log_level: LogLevel,
    sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("rows", &self.data.num_rows())
            .field("id_column", &self.id_column)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl Detector {
    /// Creates a detector logging at `warning` through `tracing`.
    ///
    /// Fails with a schema error if `id_column` is missing or not
    /// string-typed.
    pub fn new(data: impl Into<Arc<RecordBatch>>, id_column: impl Into<String>) -> Result<Self> {
        Self::builder(data, id_column).build()
    }

    pub fn builder(
        data: impl Into<Arc<RecordBatch>>,
        id_column: impl Into<String>,
    ) -> DetectorBuilder {
        DetectorBuilder {
            data: data.into(),
            id_column: id_column.into(),
            log_level: LogLevel::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Loads a panel from `source` and creates a detector over it.
    pub async fn from_source<S>(
        source: &S,
        ctx: &SessionContext,
        id_column: impl Into<String>,
    ) -> Result<Self>
    where
        S: PanelSource + ?Sized,
    {
        let batch = source.load(ctx).await?;
        Self::new(batch, id_column)
    }

    /// The panel this detector reads from.
    pub fn data(&self) -> &RecordBatch {
        &self.data
    }

    /// A shared handle to the stored snapshot.
    pub fn snapshot(&self) -> Arc<RecordBatch> {
        Arc::clone(&self.data)
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    /// Changes the log level from its name: `debug`, `info`, `warning`,
    /// `error` or `critical`.
    pub fn change_logging_level(&mut self, level: &str) -> Result<()> {
        self.log_level = level.parse()?;
        Ok(())
    }

    /// Parses an output format name, falling back to the default shape with a
    /// warning when the name is not recognised.
    ///
    /// ```rust,ignore
    /// let format: HbOutput = detector.output_format("long");
    /// ```
    pub fn output_format<F: OutputFormat>(&self, raw: &str) -> F {
        raw.parse().unwrap_or_else(|_| {
            self.diagnose(
                LogLevel::Warning,
                DiagnosticKind::Configuration,
                format!("output_format is not valid. Use {}", F::CHOICES),
            );
            F::default()
        })
    }

    /// Emits a diagnostic if it passes the level filter.
    pub(crate) fn diagnose(&self, level: LogLevel, kind: DiagnosticKind, message: impl Into<String>) {
        if level.is_at_least(self.log_level) {
            self.sink.emit(&Diagnostic::new(level, kind, message));
        }
    }

    fn validate_columns(&self, y_var: &str, time_var: &str, strata_var: Option<&str>) -> Result<()> {
        let mut validator = SchemaValidator::new(&self.data).target(y_var).time(time_var);
        if let Some(strata) = strata_var {
            validator = validator.strata(strata);
        }
        validator.validate()?;
        Ok(())
    }

    /// Name of the imputed column, announcing the `{y_var}_imputed` default.
    fn impute_column(&self, y_var: &str, impute_var: Option<&str>, announce: fn(&str) -> String) -> String {
        match impute_var {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let name = format!("{y_var}_imputed");
                self.diagnose(LogLevel::Info, DiagnosticKind::Progress, announce(&name));
                name
            }
        }
    }
}

/// Builder for [`Detector`].
pub struct DetectorBuilder {
    data: Arc<RecordBatch>,
    id_column: String,
    log_level: LogLevel,
    sink: Arc<dyn DiagnosticSink>,
}

impl DetectorBuilder {
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Sets where diagnostics go. Defaults to [`TracingSink`].
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Result<Detector> {
        SchemaValidator::new(&self.data)
            .identifier(&self.id_column)
            .validate()?;

        Ok(Detector {
            data: self.data,
            id_column: self.id_column,
            log_level: self.log_level,
            sink: self.sink,
        })
    }
}

fn flag_field(name: &str) -> Field {
    Field::new(name, DataType::Int32, true)
}
