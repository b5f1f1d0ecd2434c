//! Summaries of detection results and their rendering.
//!
//! A [`DetectionSummary`] condenses a flagged batch into counts and the list
//! of flagged units. Formatters render it for a terminal, as JSON or as
//! Markdown.
//!
//! # Examples
//!
//! ```rust,ignore
//! use vaskify::report::{DetectionSummary, HumanFormatter, SummaryFormatter};
//!
//! let flagged = detector.thousand_error("turnover", "time_period", &options)?;
//! let summary = DetectionSummary::from_batch("thousand_error", &flagged, "unit_id", "flag_thousand")?;
//! println!("{}", HumanFormatter::new().format(&summary)?);
//! ```

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int32Type};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

use crate::error::{Result, VaskError};
use crate::logging::Diagnostic;
use crate::panel::{column, label, string_column};

/// Counts describing one detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Detection method that produced the batch
    pub method: String,
    pub flag_column: String,
    pub total_rows: usize,
    /// Distinct non-null unit identifiers
    pub total_units: usize,
    /// Rows with flag 1
    pub flagged_rows: usize,
    /// Rows with a null flag
    pub missing_rows: usize,
    /// Rows with flag 0
    pub clean_rows: usize,
    /// Units with at least one flagged row, sorted
    pub flagged_units: Vec<String>,
    /// Diagnostics emitted while the batch was produced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl DetectionSummary {
    /// Summarises `batch` from its identifier and flag columns.
    pub fn from_batch(
        method: impl Into<String>,
        batch: &RecordBatch,
        id_column: &str,
        flag_column: &str,
    ) -> Result<Self> {
        let ids = string_column(batch, id_column)?;
        let flags = cast(column(batch, flag_column)?, &DataType::Int32)?;
        let flags = flags.as_primitive::<Int32Type>();

        let mut units = BTreeSet::new();
        let mut flagged_units = BTreeSet::new();
        let (mut flagged_rows, mut missing_rows, mut clean_rows) = (0, 0, 0);

        for row in 0..batch.num_rows() {
            let id = label(&ids, row);
            if let Some(id) = id {
                units.insert(id);
            }
            if flags.is_null(row) {
                missing_rows += 1;
            } else if flags.value(row) == 1 {
                flagged_rows += 1;
                if let Some(id) = id {
                    flagged_units.insert(id);
                }
            } else {
                clean_rows += 1;
            }
        }

        Ok(Self {
            method: method.into(),
            flag_column: flag_column.to_string(),
            total_rows: batch.num_rows(),
            total_units: units.len(),
            flagged_rows,
            missing_rows,
            clean_rows,
            flagged_units: flagged_units.into_iter().map(str::to_string).collect(),
            diagnostics: Vec::new(),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Share of tested rows that were flagged, in percent. Rows with a null
    /// flag were not tested.
    pub fn flag_rate(&self) -> f64 {
        let tested = self.flagged_rows + self.clean_rows;
        if tested == 0 {
            0.0
        } else {
            self.flagged_rows as f64 / tested as f64 * 100.0
        }
    }

    pub fn has_flags(&self) -> bool {
        self.flagged_rows > 0
    }
}

/// Configuration options for rendering summaries.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// List the flagged units
    pub include_units: bool,
    /// Maximum number of units to list (-1 for all)
    pub max_units: i32,
    /// Include attached diagnostics
    pub include_diagnostics: bool,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_units: true,
            max_units: -1,
            include_diagnostics: true,
            use_colors: true,
        }
    }
}

impl FormatterConfig {
    /// Counts only.
    pub fn minimal() -> Self {
        Self {
            include_units: false,
            max_units: 0,
            include_diagnostics: false,
            use_colors: false,
        }
    }

    pub fn detailed() -> Self {
        Self::default()
    }

    /// Bounded, uncoloured output for CI logs.
    pub fn ci() -> Self {
        Self {
            include_units: true,
            max_units: 50,
            include_diagnostics: true,
            use_colors: false,
        }
    }

    pub fn with_units(mut self, include: bool) -> Self {
        self.include_units = include;
        self
    }

    pub fn with_max_units(mut self, max: i32) -> Self {
        self.max_units = max;
        self
    }

    pub fn with_diagnostics(mut self, include: bool) -> Self {
        self.include_diagnostics = include;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn units<'a>(&self, summary: &'a DetectionSummary) -> &'a [String] {
        if !self.include_units {
            return &[];
        }
        let units = summary.flagged_units.as_slice();
        match usize::try_from(self.max_units) {
            Ok(max) => &units[..max.min(units.len())],
            Err(_) => units,
        }
    }
}

/// Renders a [`DetectionSummary`] as text.
pub trait SummaryFormatter {
    fn format(&self, summary: &DetectionSummary) -> Result<String>;

    fn format_with_config(
        &self,
        summary: &DetectionSummary,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(summary)
    }
}

fn render_error(e: std::fmt::Error) -> VaskError {
    VaskError::Internal(format!("Failed to render summary: {e}"))
}

/// Formats summaries as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryFormatter for JsonFormatter {
    fn format(&self, summary: &DetectionSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(
        &self,
        summary: &DetectionSummary,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut filtered = summary.clone();
        filtered.flagged_units = config.units(summary).to_vec();
        if !config.include_diagnostics {
            filtered.diagnostics.clear();
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&filtered)?
        } else {
            serde_json::to_string(&filtered)?
        };
        Ok(json)
    }
}

/// Formats summaries for console output.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        out: &mut String,
        summary: &DetectionSummary,
        config: &FormatterConfig,
    ) -> std::fmt::Result {
        let verdict = match (summary.has_flags(), config.use_colors) {
            (true, true) => "\x1b[31mFLAGGED\x1b[0m",
            (true, false) => "FLAGGED",
            (false, true) => "\x1b[32mCLEAN\x1b[0m",
            (false, false) => "CLEAN",
        };
        writeln!(out, "{} ({}): {verdict}", summary.method, summary.flag_column)?;
        writeln!(
            out,
            "   Rows: {}  Units: {}",
            summary.total_rows, summary.total_units
        )?;
        writeln!(
            out,
            "   Flagged: {}  Clean: {}  Not tested: {}",
            summary.flagged_rows, summary.clean_rows, summary.missing_rows
        )?;
        writeln!(out, "   Flag rate: {:.1}%", summary.flag_rate())?;

        let units = config.units(summary);
        if !units.is_empty() {
            write!(out, "   Flagged units: {}", units.join(", "))?;
            let hidden = summary.flagged_units.len() - units.len();
            if hidden > 0 {
                write!(out, " (+{hidden} more)")?;
            }
            writeln!(out)?;
        }

        if config.include_diagnostics && !summary.diagnostics.is_empty() {
            writeln!(out, "   Diagnostics:")?;
            for diagnostic in &summary.diagnostics {
                writeln!(
                    out,
                    "     [{}] {}: {}",
                    diagnostic.level, diagnostic.kind, diagnostic.message
                )?;
            }
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryFormatter for HumanFormatter {
    fn format(&self, summary: &DetectionSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(
        &self,
        summary: &DetectionSummary,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        Self::render(&mut output, summary, config).map_err(render_error)?;
        Ok(output)
    }
}

/// Formats summaries as Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the heading level (1-6).
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn render(
        &self,
        out: &mut String,
        summary: &DetectionSummary,
        config: &FormatterConfig,
    ) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);

        writeln!(out, "{h} Detection summary: {}", summary.method)?;
        writeln!(out)?;
        writeln!(out, "| Metric | Value |")?;
        writeln!(out, "|--------|-------|")?;
        writeln!(out, "| Flag column | `{}` |", summary.flag_column)?;
        writeln!(out, "| Rows | {} |", summary.total_rows)?;
        writeln!(out, "| Units | {} |", summary.total_units)?;
        writeln!(out, "| Flagged rows | {} |", summary.flagged_rows)?;
        writeln!(out, "| Clean rows | {} |", summary.clean_rows)?;
        writeln!(out, "| Not tested | {} |", summary.missing_rows)?;
        writeln!(out, "| Flag rate | {:.1}% |", summary.flag_rate())?;

        let units = config.units(summary);
        if !units.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Flagged units")?;
            writeln!(out)?;
            for unit in units {
                writeln!(out, "- `{unit}`")?;
            }
        }

        if config.include_diagnostics && !summary.diagnostics.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Diagnostics")?;
            writeln!(out)?;
            for diagnostic in &summary.diagnostics {
                writeln!(
                    out,
                    "- **{}** ({}): {}",
                    diagnostic.level, diagnostic.kind, diagnostic.message
                )?;
            }
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryFormatter for MarkdownFormatter {
    fn format(&self, summary: &DetectionSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(
        &self,
        summary: &DetectionSummary,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, summary, config)
            .map_err(render_error)?;
        Ok(output)
    }
}
