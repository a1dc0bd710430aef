//! ## statmap-core::programs
//! **Counting programs**
//!
//! Each program is invoked once per unit of work by whatever intercepts the
//! traffic or kernel events, and touches exactly one record of its table.
//! Programs come in two flavours of entry point: a typed `try_*` /
//! `record_*` call returning [`CountError`], and a `run` call returning the
//! plain status code a kernel-side program would return.
//!
//! [`CountError`]: crate::error::CountError

pub mod action;
pub mod classifier;
pub mod probe;
pub mod tracepoint;

pub use action::{tc_action, xdp_action, ActionSet, Tc, Xdp};
pub use classifier::{ClassifierCounter, PacketContext};
pub use probe::ProbeCounter;
pub use tracepoint::{signal_name, EventOutcome, KillArgs, SignalCounter, SIGUSR1};

use crate::registry::{MapDef, Pinning};

/// Per-action packet stats of the XDP classifier.
pub const XDP_STATS_MAP: MapDef = MapDef::new("xdp_stats_map", Xdp::MAX_ACTIONS, Pinning::ByName);

/// Per-action packet stats of the TC classifier.
pub const TC_STATS_MAP: MapDef = MapDef::new("tc_stats_map", Tc::MAX_ACTIONS, Pinning::ByName);

/// Matched kill-signal calls. Only index 0 is used.
pub const TRACEPOINT_STATS_MAP: MapDef = MapDef::new("tracepoint_stats_map", 8, Pinning::ByName);

/// Kprobe invocation count.
pub const KPROBE_STATS_MAP: MapDef = MapDef::new("kprobe_stats_map", 1, Pinning::ByName);

/// Uretprobe invocation count.
pub const URETPROBE_STATS_MAP: MapDef = MapDef::new("uretprobe_stats_map", 1, Pinning::ByName);
