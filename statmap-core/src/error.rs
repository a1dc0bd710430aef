use std::sync::Arc;

use thiserror::Error;

/// Failures of table setup and of a single counting invocation.
///
/// None of these are fatal: programs turn them into a reject code and the
/// caller decides what to do with the unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountError {
    #[error("Table capacity must be non-zero (units: {num_units}, keys: {max_keys})")]
    Capacity { num_units: usize, max_keys: u32 },

    #[error("Malformed input: end offset {data_end} precedes start offset {data}")]
    MalformedInput { data: u64, data_end: u64 },

    #[error("Key {key} out of range (max keys: {max_keys})")]
    KeyOutOfRange { key: u32, max_keys: u32 },

    #[error("Processing unit {unit} out of range (units: {num_units})")]
    UnitOutOfRange { unit: usize, num_units: usize },

    #[error("Processing unit {unit} already has a writer")]
    UnitBusy { unit: usize },

    #[error("Table '{name}' is not available")]
    TableUnavailable { name: Arc<str> },
}

impl CountError {
    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            CountError::Capacity { .. } => "capacity",
            CountError::MalformedInput { .. } => "malformed_input",
            CountError::KeyOutOfRange { .. } => "key_out_of_range",
            CountError::UnitOutOfRange { .. } => "unit_out_of_range",
            CountError::UnitBusy { .. } => "unit_busy",
            CountError::TableUnavailable { .. } => "table_unavailable",
        }
    }
}
