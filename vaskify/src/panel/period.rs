//! Time period labels accepted by the detectors.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static PERIOD_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is compile-time constant and known to be valid
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9]{4}(-[0-9]{2}(-[0-9]{2})?|-(Q[1-4]|W(0[1-9]|[1-4][0-9]|5[0-3]))|-[0-9]{3})?$")
        .expect("Hard-coded regex pattern should be valid")
});

/// Calendar granularity of a period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodFormat {
    /// `YYYY`
    Year,
    /// `YYYY-MM`
    YearMonth,
    /// `YYYY-MM-DD`
    YearMonthDay,
    /// `YYYY-Qn`
    YearQuarter,
    /// `YYYY-Www`
    IsoWeek,
    /// `YYYY-DDD`
    OrdinalDay,
}

impl PeriodFormat {
    /// Classifies a period label, or returns `None` if it matches no
    /// accepted format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vaskify::panel::PeriodFormat;
    ///
    /// assert_eq!(PeriodFormat::detect("2024-Q3"), Some(PeriodFormat::YearQuarter));
    /// assert_eq!(PeriodFormat::detect("2024-W07"), Some(PeriodFormat::IsoWeek));
    /// assert_eq!(PeriodFormat::detect("2024/07"), None);
    /// ```
    pub fn detect(value: &str) -> Option<Self> {
        if !PERIOD_REGEX.is_match(value) {
            return None;
        }
        // the regex guarantees an ASCII `YYYY` prefix
        let rest = &value[4..];
        let format = match rest.len() {
            0 => PeriodFormat::Year,
            _ if rest.starts_with("-Q") => PeriodFormat::YearQuarter,
            _ if rest.starts_with("-W") => PeriodFormat::IsoWeek,
            3 => PeriodFormat::YearMonth,
            4 => PeriodFormat::OrdinalDay,
            _ => PeriodFormat::YearMonthDay,
        };
        Some(format)
    }

    /// The pattern a label of this format follows.
    pub fn pattern(&self) -> &'static str {
        match self {
            PeriodFormat::Year => "YYYY",
            PeriodFormat::YearMonth => "YYYY-MM",
            PeriodFormat::YearMonthDay => "YYYY-MM-DD",
            PeriodFormat::YearQuarter => "YYYY-Qq",
            PeriodFormat::IsoWeek => "YYYY-Www",
            PeriodFormat::OrdinalDay => "YYYY-DDD",
        }
    }
}

impl fmt::Display for PeriodFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

/// Checks whether a label matches any accepted period format.
pub fn is_valid_period(value: &str) -> bool {
    PERIOD_REGEX.is_match(value)
}
