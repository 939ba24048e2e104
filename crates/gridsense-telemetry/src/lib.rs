//! gridsense Telemetry
//!
//! Reporting and metrics for classification cycles.
//!
//! Provides:
//! - Human-readable and JSON diagnostic reports per input line
//! - Aggregate counters and latency totals
//! - `metrics` crate emission for an installed recorder

pub mod metrics;
pub mod report;

pub use crate::metrics::{MetricsCollector, MetricsSnapshot};
pub use report::{DiagnosticReport, ReportFormat};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::MetricsCollector;
    pub use crate::report::{DiagnosticReport, ReportFormat};
}
