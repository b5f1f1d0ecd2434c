//! Structured JSON logging of detector diagnostics.
//!
//! Detector diagnostics go through `tracing` by default. Run with
//! `RUST_LOG=vaskify=debug` to also see the fitted HB intervals.

use std::error::Error;
use vaskify::logging::setup::{init_logging, LoggingConfig};
use vaskify::prelude::*;
use vaskify::testdata::{generate_panel, PeriodGranularity};

fn main() -> std::result::Result<(), Box<dyn Error>> {
    init_logging(LoggingConfig::structured())?;

    let panel = generate_panel(50, 3, PeriodGranularity::Quarterly, 1)?;
    let mut detector = Detector::new(panel, "unit_id")?;
    detector.change_logging_level("info")?;

    // Three periods: reported, then the first two are compared.
    let hb = detector.hb("turnover", "time_period", &HbOptions::default())?;
    tracing::info!(rows = hb.num_rows(), "hb finished");

    let options = AccumulationErrorOptions::default().with_impute(true);
    detector.accumulation_error("turnover", "time_period", &options)?;

    detector.change_logging_level("error")?;
    let format: DataOutput = detector.output_format("table");
    tracing::info!(%format, "fell back to the default output format");

    Ok(())
}
