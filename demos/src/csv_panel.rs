//! Loads a panel from CSV and writes the HB outliers back to CSV.
//!
//! ```text
//! cargo run -p vaskify-demos --example csv_panel
//! ```

use arrow::csv::Writer;
use datafusion::prelude::SessionContext;
use std::error::Error;
use std::fs::File;
use tempfile::TempDir;
use vaskify::prelude::*;
use vaskify::sources::{CsvOptions, CsvSource};
use vaskify::testdata::{generate_panel, PeriodGranularity};
use vaskify_demos::section;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let input = dir.path().join("survey.csv");
    let output = dir.path().join("hb_outliers.csv");

    let panel = generate_panel(500, 2, PeriodGranularity::Yearly, 7)?;
    let mut writer = Writer::new(File::create(&input)?);
    writer.write(&panel)?;
    drop(writer);

    section("Loading");
    // Years and unit ids are read as integers unless listed here.
    let source = CsvSource::with_options(
        input.to_string_lossy(),
        CsvOptions::default().with_string_columns(["unit_id", "time_period"]),
    );
    println!("{}", source.description());
    let ctx = SessionContext::new();
    let detector = Detector::from_source(&source, &ctx, "unit_id").await?;
    println!("{} rows loaded", detector.data().num_rows());

    section("Outliers");
    let options = HbOptions::default()
        .with_pc(4.0)
        .with_output_format(detector.output_format("outliers"));
    let outliers = detector.hb("turnover", "time_period", &options)?;
    let mut writer = Writer::new(File::create(&output)?);
    writer.write(&outliers)?;
    drop(writer);
    println!("{} outliers written to {}", outliers.num_rows(), output.display());

    Ok(())
}
