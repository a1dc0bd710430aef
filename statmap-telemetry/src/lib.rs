//! # statmap Telemetry
//!
//! Log subscriber setup, trace pipe draining and the Prometheus exporter
//! for table snapshots.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
