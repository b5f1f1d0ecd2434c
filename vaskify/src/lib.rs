//! # vaskify - error and outlier detection for survey panels
//!
//! vaskify finds suspicious values in longitudinal business-survey data, such
//! as turnover reported by companies month after month. The data is a
//! long-format Apache Arrow [`RecordBatch`](arrow::record_batch::RecordBatch)
//! with one row per unit per period, and every detector returns a new batch
//! with a flag column.
//!
//! ## Detectors
//!
//! - **Thousand errors**: a value off by a factor of about 1000 from the
//!   previous period, typically reported in units instead of thousands.
//! - **Accumulation errors**: a value that grew implausibly, typically a
//!   running total reported instead of the period figure.
//! - **Hidiroglou-Berthelot**: robust outlier test on the ratio between two
//!   periods, with size-weighted limits around the median ratio, optionally
//!   computed per stratum.
//!
//! Flags are `1` (suspicious), `0` (accepted) or null (not tested, for
//! example a unit's first period).
//!
//! ## Quick Start
//!
//! ```rust
//! use vaskify::prelude::*;
//! use vaskify::testdata::{generate_panel, PeriodGranularity};
//!
//! # fn main() -> vaskify::error::Result<()> {
//! let panel = generate_panel(5, 2, PeriodGranularity::Monthly, 42)?;
//! let detector = Detector::new(panel, "unit_id")?;
//!
//! let flagged = detector.thousand_error("turnover", "time_period", &ThousandErrorOptions::default())?;
//! assert!(flagged.column_by_name("flag_thousand").is_some());
//!
//! let wide = detector.hb("turnover", "time_period", &HbOptions::default())?;
//! assert_eq!(wide.num_rows(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Diagnostics
//!
//! Detectors report progress and data problems through a
//! [`DiagnosticSink`](logging::DiagnosticSink) filtered by the detector's
//! [`LogLevel`](logging::LogLevel). The default sink forwards to `tracing`;
//! install a subscriber with [`logging::setup::init_logging`] or collect
//! diagnostics with [`RecordingSink`](logging::RecordingSink).

pub mod detect;
pub mod error;
pub mod logging;
pub mod panel;
pub mod prelude;
pub mod report;
pub mod sources;
pub mod testdata;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
