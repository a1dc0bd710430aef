//! Counter table sizing and pinning.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Table layout shared by every counting program.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TablesConfig {
    /// Processing units each table is replicated across.
    #[validate(range(min = 1, max = 4096))]
    #[serde(default = "default_num_units")]
    pub num_units: usize,

    /// Namespace pinned tables are published under.
    #[validate(length(min = 1))]
    #[serde(default = "default_pin_root")]
    pub pin_root: String,
}

fn default_num_units() -> usize {
    num_cpus::get()
}

fn default_pin_root() -> String {
    "/sys/fs/bpf/statmap".into()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            num_units: default_num_units(),
            pin_root: default_pin_root(),
        }
    }
}
