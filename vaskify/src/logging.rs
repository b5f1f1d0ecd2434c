//! Diagnostics and logging configuration for vaskify.
//!
//! The detection engine never writes to the console itself. Each
//! [`Detector`](crate::detect::Detector) owns a [`LogLevel`] filter and an
//! injected [`DiagnosticSink`]; messages that pass the filter are handed to the
//! sink. [`TracingSink`] forwards them to the `tracing` ecosystem, so output
//! format and destination are whatever subscriber the application installs
//! (see [`setup::init_logging`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::VaskError;

/// Severity of a diagnostic, ordered from least to most severe.
///
/// # Examples
///
/// ```rust
/// use vaskify::logging::LogLevel;
///
/// assert!(LogLevel::Error > LogLevel::Warning);
/// assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 10,
    Info = 20,
    #[default]
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl LogLevel {
    /// Returns the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }

    /// Checks if this level is at least as severe as another level.
    pub fn is_at_least(&self, other: LogLevel) -> bool {
        *self >= other
    }

    /// Returns the numeric severity (10 for debug up to 50 for critical).
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// The closest `tracing` level. Critical maps to `ERROR`.
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = VaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(VaskError::Configuration(format!(
                "Unknown log level '{other}'. Choose between 'debug', 'info', 'warning', 'error' and 'critical'"
            ))),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Progress and result information.
    Progress,
    /// An option value was not recognised and a default was used.
    Configuration,
    /// A requested feature is not available for the method.
    UnsupportedOperation,
    /// The data does not meet a method's preconditions.
    DataQuality,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Progress => "progress",
            DiagnosticKind::Configuration => "configuration",
            DiagnosticKind::UnsupportedOperation => "unsupported_operation",
            DiagnosticKind::DataQuality => "data_quality",
        };
        f.write_str(name)
    }
}

/// A single message emitted by the detection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: LogLevel,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(level: LogLevel, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
        }
    }
}

/// Receives diagnostics that passed a detector's level filter.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` under the `vaskify::detect` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let kind = diagnostic.kind;
        let message = diagnostic.message.as_str();
        match diagnostic.level {
            LogLevel::Debug => tracing::debug!(target: "vaskify::detect", %kind, "{message}"),
            LogLevel::Info => tracing::info!(target: "vaskify::detect", %kind, "{message}"),
            LogLevel::Warning => tracing::warn!(target: "vaskify::detect", %kind, "{message}"),
            LogLevel::Error => tracing::error!(target: "vaskify::detect", %kind, "{message}"),
            LogLevel::Critical => {
                tracing::error!(target: "vaskify::detect", %kind, critical = true, "{message}")
            }
        }
    }
}

/// Keeps every diagnostic in memory.
///
/// Useful in tests and for applications that attach diagnostics to a report
/// instead of a log stream.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the recorded messages in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics().into_iter().map(|d| d.message).collect()
    }

    /// Checks whether any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.diagnostics().iter().any(|d| d.message.contains(needle))
    }

    /// Returns the diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.kind == kind)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}

/// Utilities for installing a `tracing` subscriber.
pub mod setup {
    use tracing::Level;

    /// Configuration for the process-wide subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for vaskify components specifically
        pub vaskify_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                vaskify_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                vaskify_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                vaskify_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Creates a configuration for structured JSON logging.
        pub fn structured() -> Self {
            Self {
                level: Level::INFO,
                vaskify_level: Level::DEBUG,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_vaskify_level(mut self, level: Level) -> Self {
            self.vaskify_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},vaskify={}",
                    self.level.as_str().to_lowercase(),
                    self.vaskify_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber with an `EnvFilter` and a fmt layer.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use vaskify::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development()).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Critical > LogLevel::Error);
        assert!(LogLevel::Error > LogLevel::Warning);
        assert!(LogLevel::Warning > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert_eq!(LogLevel::default(), LogLevel::Warning);
    }

    #[test]
    fn test_level_severity_numbers() {
        assert_eq!(LogLevel::Debug.severity(), 10);
        assert_eq!(LogLevel::Warning.severity(), 30);
        assert_eq!(LogLevel::Critical.severity(), 50);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!(matches!(
            "verbose".parse::<LogLevel>(),
            Err(VaskError::Configuration(_))
        ));
    }

    #[test]
    fn test_level_is_at_least() {
        assert!(LogLevel::Error.is_at_least(LogLevel::Warning));
        assert!(LogLevel::Warning.is_at_least(LogLevel::Warning));
        assert!(!LogLevel::Info.is_at_least(LogLevel::Warning));
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&LogLevel::Error).unwrap();
        assert_eq!(json, "\"error\"");

        let level: LogLevel = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(level, LogLevel::Info);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.emit(&Diagnostic::new(
            LogLevel::Error,
            DiagnosticKind::UnsupportedOperation,
            "Imputation not implemented for this method.",
        ));
        sink.emit(&Diagnostic::new(
            LogLevel::Info,
            DiagnosticKind::Progress,
            "No outliers detected",
        ));

        assert!(sink.contains("Imputation not implemented"));
        assert_eq!(sink.of_kind(DiagnosticKind::Progress).len(), 1);
        assert_eq!(sink.messages().len(), 2);

        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_logging_config_env_filter() {
        let config = setup::LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,vaskify=debug");

        let config = setup::LoggingConfig::production().with_env_filter("vaskify=trace");
        assert_eq!(config.env_filter(), "vaskify=trace");
        assert!(config.json_format);
    }
}
