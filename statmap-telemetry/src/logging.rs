//! ## statmap-telemetry::logging
//! **Structured logging with `tracing`**

use statmap_core::trace::TraceRecord;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber.
    ///
    /// `RUST_LOG` wins over `default_directives` when set.
    pub fn init(default_directives: &str) -> Result<(), TryInitError> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_directives)),
            )
            .with_thread_names(true)
            .finish()
            .try_init()
    }

    /// Logs records drained from the trace pipe `pipe`, one line each.
    ///
    /// Records of every program share a pipe; the message names the source.
    pub fn log_trace_records(pipe: &str, records: &[TraceRecord]) {
        for record in records {
            tracing::debug!(
                pipe,
                unit = record.unit,
                timestamp_ns = record.timestamp_ns,
                "{}",
                record.message
            );
        }
    }
}
