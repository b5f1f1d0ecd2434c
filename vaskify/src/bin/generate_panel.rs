//! Write a synthetic survey panel to disk.
//!
//! The output format follows the file extension: `.parquet` writes Parquet,
//! anything else writes CSV with a header row.

use clap::Parser;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::PathBuf;
use vaskify::testdata::{generate_panel, PeriodGranularity};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to write (`.parquet` or CSV)
    output: PathBuf,

    /// Number of units
    #[arg(default_value_t = 100)]
    units: usize,

    /// Number of periods per unit
    #[arg(default_value_t = 12)]
    periods: usize,

    /// Period spacing: monthly, quarterly or yearly
    #[arg(default_value_t = PeriodGranularity::Monthly)]
    granularity: PeriodGranularity,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!(
        "Generating {} units over {} {} periods (seed {})...",
        args.units, args.periods, args.granularity, args.seed
    );
    let panel = generate_panel(args.units, args.periods, args.granularity, args.seed)?;

    let path = args.output.as_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;

    if path.extension().is_some_and(|ext| ext == "parquet") {
        let mut writer = ArrowWriter::try_new(file, panel.schema(), None)?;
        writer.write(&panel)?;
        writer.close()?;
    } else {
        let mut writer = arrow::csv::Writer::new(file);
        writer.write(&panel)?;
    }

    println!("Wrote {} rows to {}", panel.num_rows(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["generate-panel", "panel.csv"]).unwrap();
        assert_eq!(args.output, PathBuf::from("panel.csv"));
        assert_eq!(args.units, 100);
        assert_eq!(args.periods, 12);
        assert_eq!(args.granularity, PeriodGranularity::Monthly);
        assert_eq!(args.seed, 42);
    }

    #[test]
    fn test_positional_and_seed() {
        let args = Args::try_parse_from([
            "generate-panel",
            "out/panel.parquet",
            "20",
            "4",
            "quarterly",
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(args.units, 20);
        assert_eq!(args.periods, 4);
        assert_eq!(args.granularity, PeriodGranularity::Quarterly);
        assert_eq!(args.seed, 7);
    }

    #[test]
    fn test_rejects_unknown_granularity() {
        assert!(Args::try_parse_from(["generate-panel", "panel.csv", "10", "2", "weekly"]).is_err());
        assert!(Args::try_parse_from(["generate-panel"]).is_err());
    }
}
