//! Logging and diagnostics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Default `EnvFilter` directives; `RUST_LOG` takes precedence.
    #[validate(custom(function = validation::validate_log_level))]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Capacity of the diagnostic trace pipe.
    #[validate(range(min = 1, max = 1_048_576))]
    #[serde(default = "default_trace_capacity")]
    pub trace_capacity: usize,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_trace_capacity() -> usize {
    4096
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            trace_capacity: default_trace_capacity(),
        }
    }
}
