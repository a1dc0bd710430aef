//! # statmap-core
//!
//! Per-processing-unit counter tables and the counting programs that update
//! them on the hot path.
//!
//! ### Expectations:
//! - Zero heap allocations when counting an event
//! - Each processing unit writes only to its own slice of a table
//! - Readers reduce across units out of band, without locks
//!
//! ### Key Submodules:
//! - `table`: bounded `units × keys` counter storage with per-unit writers
//! - `record`: fixed-layout counter records shared with kernel-side maps
//! - `programs`: classifier, filtered event and probe counters
//! - `trace`: best-effort diagnostic pipe
//! - `registry`: pin-by-name table namespace

pub mod error;
pub mod programs;
pub mod record;
pub mod registry;
pub mod table;
pub mod trace;

#[cfg(feature = "bpffs")]
pub mod bpffs;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::programs::*;
    pub use crate::record::*;
    pub use crate::registry::*;
    pub use crate::table::*;
    pub use crate::trace::*;
}

pub use error::CountError;
