//! Stats reader and synthetic workload parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Periodic reader of the pinned tables.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReaderConfig {
    /// Poll interval (milliseconds).
    #[validate(range(min = 100, max = 60_000))]
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    2000
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// Shape of the generated traffic used by `simulate` and `watch`.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct WorkloadConfig {
    /// Fraction of packets whose end offset precedes the start.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_malformed_ratio")]
    pub malformed_ratio: f64,

    /// Fraction of packets classified with an out-of-range action.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_out_of_range_ratio")]
    pub out_of_range_ratio: f64,

    /// Fraction of kill events carrying the target signal.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_target_signal_ratio")]
    pub target_signal_ratio: f64,

    /// Largest generated packet (bytes).
    #[validate(range(min = 64, max = 65_535))]
    #[serde(default = "default_max_packet_len")]
    pub max_packet_len: u64,

    /// Pause between generated batches in `watch` mode (milliseconds).
    #[validate(range(max = 10_000))]
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

fn default_malformed_ratio() -> f64 {
    0.01
}

fn default_out_of_range_ratio() -> f64 {
    0.01
}

fn default_target_signal_ratio() -> f64 {
    0.25
}

fn default_max_packet_len() -> u64 {
    1514 // Standard Ethernet MTU.
}

fn default_batch_pause_ms() -> u64 {
    10
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            malformed_ratio: default_malformed_ratio(),
            out_of_range_ratio: default_out_of_range_ratio(),
            target_signal_ratio: default_target_signal_ratio(),
            max_packet_len: default_max_packet_len(),
            batch_pause_ms: default_batch_pause_ms(),
        }
    }
}
