//! # statmap-engine
//!
//! Everything around the counting programs: bringing the tables up and
//! down, driving the programs on one thread per processing unit, and
//! reading the pinned tables back.

pub mod error;
pub mod reader;
pub mod runtime;
pub mod subsystem;
pub mod tally;
pub mod workload;

pub use error::EngineError;
pub use reader::{StatsReader, StatsReport};
pub use runtime::{run_simulation, run_watch, SimulationReport};
pub use subsystem::{Subsystem, UnitPrograms};
