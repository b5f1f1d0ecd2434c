//! Prelude for commonly used types and traits in vaskify.

pub use crate::detect::{
    AccumulationErrorOptions, DataOutput, Detector, HbOptions, HbOutput, ThousandErrorOptions,
};
pub use crate::error::{ErrorContext, Result, SchemaError, VaskError};
pub use crate::logging::{DiagnosticKind, DiagnosticSink, LogLevel, RecordingSink, TracingSink};
pub use crate::report::{DetectionSummary, FormatterConfig, SummaryFormatter};
pub use crate::sources::PanelSource;
