//! Runs all three detectors over a generated turnover panel.
//!
//! ```text
//! cargo run -p vaskify-demos --example detect_turnover
//! ```

use std::error::Error;
use vaskify::prelude::*;
use vaskify::testdata::{generate_panel, PeriodGranularity};
use vaskify_demos::{print_summary, section};

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let panel = generate_panel(200, 6, PeriodGranularity::Monthly, 2024)?;
    let sink = std::sync::Arc::new(RecordingSink::new());
    let detector = Detector::builder(panel, "unit_id")
        .log_level(LogLevel::Info)
        .sink(sink.clone())
        .build()?;

    section("Thousand errors");
    let options = ThousandErrorOptions::default().with_impute(true);
    let thousand = detector.thousand_error("turnover", "time_period", &options)?;
    let summary = DetectionSummary::from_batch("thousand_error", &thousand, "unit_id", "flag_thousand")?
        .with_diagnostics(sink.diagnostics());
    print_summary(&summary, false)?;
    sink.clear();

    section("Accumulation errors");
    let options = AccumulationErrorOptions::default()
        .with_error(0.8)
        .with_output_format(DataOutput::Outliers);
    let accumulation = detector.accumulation_error("turnover", "time_period", &options)?;
    println!("{} rows belong to units with only accumulated values", accumulation.num_rows());
    for message in sink.messages() {
        println!("  {message}");
    }
    sink.clear();

    section("Hidiroglou-Berthelot");
    let options = HbOptions::default()
        .with_time_periods("2020-05", "2020-06")
        .with_strata("category_code")
        .with_pc(10.0)
        .with_output_format(HbOutput::Long);
    let hb = detector.hb("turnover", "time_period", &options)?;
    let summary = DetectionSummary::from_batch("hb", &hb, "unit_id", "flag_hb")?
        .with_diagnostics(sink.diagnostics());
    print_summary(&summary, true)?;

    Ok(())
}
