//! Result shapes the detectors can return.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VaskError;

/// An output shape selectable by name.
pub trait OutputFormat: FromStr<Err = VaskError> + Default + Copy + fmt::Display {
    /// Human-readable list of accepted names, used in warnings.
    const CHOICES: &'static str;
}

/// Output of the thousand-error and accumulation-error detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOutput {
    /// The full sorted panel with the flag column added.
    #[default]
    Data,
    /// Only the rows of units selected as outliers.
    Outliers,
}

/// Output of the HB detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HbOutput {
    /// One row per unit with both period values, ratio, limits and flag.
    #[default]
    Wide,
    /// One row per unit per period.
    Long,
    /// Wide rows with flag 1.
    Outliers,
}

impl DataOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataOutput::Data => "data",
            DataOutput::Outliers => "outliers",
        }
    }
}

impl HbOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            HbOutput::Wide => "wide",
            HbOutput::Long => "long",
            HbOutput::Outliers => "outliers",
        }
    }
}

impl fmt::Display for DataOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for HbOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataOutput {
    type Err = VaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(DataOutput::Data),
            "outliers" => Ok(DataOutput::Outliers),
            _ => Err(VaskError::configuration(format!(
                "unknown output format '{s}', expected {}",
                Self::CHOICES
            ))),
        }
    }
}

impl FromStr for HbOutput {
    type Err = VaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wide" => Ok(HbOutput::Wide),
            "long" => Ok(HbOutput::Long),
            "outliers" => Ok(HbOutput::Outliers),
            _ => Err(VaskError::configuration(format!(
                "unknown output format '{s}', expected {}",
                Self::CHOICES
            ))),
        }
    }
}

impl OutputFormat for DataOutput {
    const CHOICES: &'static str = "'data' or 'outliers'";
}

impl OutputFormat for HbOutput {
    const CHOICES: &'static str = "'wide', 'outliers' or 'long'";
}
