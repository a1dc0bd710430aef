//! Counting program parameters.
//!
//! Each program can be switched off independently; a disabled program has
//! no table pinned for it.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ProgramsConfig {
    #[validate(nested)]
    #[serde(default)]
    pub xdp: ClassifierConfig,

    #[validate(nested)]
    #[serde(default)]
    pub tc: ClassifierConfig,

    #[validate(nested)]
    #[serde(default)]
    pub tracepoint: TracepointConfig,

    #[validate(nested)]
    #[serde(default)]
    pub kprobe: KprobeConfig,

    #[validate(nested)]
    #[serde(default)]
    pub uretprobe: UretprobeConfig,
}

/// XDP / TC packet classifier.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interface the classifier is attached to.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interface: default_interface(),
        }
    }
}

/// Kill-signal tracepoint counter.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TracepointConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Signal number that is counted; everything else is ignored.
    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_target_signal")]
    pub target_signal: i64,
}

impl Default for TracepointConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            target_signal: default_target_signal(),
        }
    }
}

/// Kernel function probe counter.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct KprobeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Probed kernel function.
    #[validate(custom(function = validation::validate_symbol))]
    #[serde(default = "default_fn_name")]
    pub fn_name: String,
}

impl Default for KprobeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            fn_name: default_fn_name(),
        }
    }
}

/// User-space function return probe counter.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct UretprobeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Binary or library the probe is attached to.
    #[validate(length(min = 1))]
    #[serde(default = "default_target")]
    pub target: String,

    /// Probed function in `target`.
    #[validate(custom(function = validation::validate_symbol))]
    #[serde(default = "default_uretprobe_fn_name")]
    pub fn_name: String,
}

impl Default for UretprobeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            target: default_target(),
            fn_name: default_uretprobe_fn_name(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interface() -> String {
    "eth0".into()
}

fn default_target_signal() -> i64 {
    10 // SIGUSR1
}

fn default_fn_name() -> String {
    "try_to_wake_up".into()
}

fn default_target() -> String {
    "libc".into()
}

fn default_uretprobe_fn_name() -> String {
    "malloc".into()
}
