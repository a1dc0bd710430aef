//! ## statmap-core::programs::tracepoint
//! **Filtered kill-signal counter**
//!
//! Counts `kill` syscalls carrying one target signal and ignores every
//! other signal. The signal comparison is the only gate in front of the
//! table.

use std::sync::Arc;

use crate::error::CountError;
use crate::record::CallRecord;
use crate::table::UnitWriter;
use crate::trace::TracePipe;

pub const SIGUSR1: i64 = 10;

const COUNTER_INDEX: u32 = 0;

/// Record layout of the `syscalls/sys_enter_kill` tracepoint.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillArgs {
    pub pad: i64,
    pub syscall_nr: i64,
    pub pid: i64,
    pub sig: i64,
}

impl KillArgs {
    pub const fn new(pid: i64, sig: i64) -> Self {
        Self {
            pad: 0,
            syscall_nr: 62,
            pid,
            sig,
        }
    }
}

/// Non-error result of a filtered invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event carried another signal; nothing was touched.
    Ignored,
    /// The event matched and was counted.
    Handled,
}

macro_rules! signals {
    ($($num:literal => $name:literal),* $(,)?) => {
        /// Name of a standard Linux signal number.
        pub fn signal_name(sig: i64) -> Option<&'static str> {
            match sig {
                $($num => Some($name),)*
                _ => None,
            }
        }

        fn received_message(sig: i64) -> &'static str {
            match sig {
                $($num => concat!("process received ", $name),)*
                _ => "process received target signal",
            }
        }
    };
}

signals! {
    1 => "SIGHUP",
    2 => "SIGINT",
    3 => "SIGQUIT",
    6 => "SIGABRT",
    9 => "SIGKILL",
    10 => "SIGUSR1",
    12 => "SIGUSR2",
    13 => "SIGPIPE",
    14 => "SIGALRM",
    15 => "SIGTERM",
    17 => "SIGCHLD",
    18 => "SIGCONT",
    19 => "SIGSTOP",
}

/// Counts kill events carrying `target` on one unit.
pub struct SignalCounter {
    writer: UnitWriter<CallRecord>,
    trace: Arc<TracePipe>,
    target: i64,
    message: &'static str,
}

impl SignalCounter {
    pub fn new(writer: UnitWriter<CallRecord>, trace: Arc<TracePipe>, target: i64) -> Self {
        Self {
            writer,
            trace,
            target,
            message: received_message(target),
        }
    }

    /// Counter for `SIGUSR1`.
    pub fn sigusr1(writer: UnitWriter<CallRecord>, trace: Arc<TracePipe>) -> Self {
        Self::new(writer, trace, SIGUSR1)
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn unit(&self) -> usize {
        self.writer.unit()
    }

    #[inline]
    pub fn try_record(&mut self, args: &KillArgs) -> Result<EventOutcome, CountError> {
        if args.sig != self.target {
            return Ok(EventOutcome::Ignored);
        }

        {
            let mut rec = self.writer.get_or_fail(COUNTER_INDEX)?;
            rec.calls = rec.calls.wrapping_add(1);
        }
        self.trace.emit(self.writer.unit(), self.message);

        Ok(EventOutcome::Handled)
    }

    /// Program entry point: 0 when handled or ignored, 1 on error.
    #[inline]
    pub fn run(&mut self, args: &KillArgs) -> u32 {
        match self.try_record(args) {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::PerUnitTable;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    fn counter() -> (Arc<PerUnitTable<CallRecord>>, Arc<TracePipe>, SignalCounter) {
        let table = PerUnitTable::create("tracepoint_stats_map", 2, 8).unwrap();
        let trace = Arc::new(TracePipe::with_capacity(64));
        let counter = SignalCounter::sigusr1(table.claim(0).unwrap(), Arc::clone(&trace));
        (table, trace, counter)
    }

    #[test]
    fn counts_only_matching_signal() {
        let (table, trace, mut counter) = counter();
        for _ in 0..2 {
            assert_eq!(
                counter.try_record(&KillArgs::new(42, SIGUSR1)),
                Ok(EventOutcome::Handled)
            );
        }
        for _ in 0..5 {
            assert_eq!(
                counter.try_record(&KillArgs::new(42, 15)),
                Ok(EventOutcome::Ignored)
            );
        }

        assert_eq!(table.snapshot(0).unwrap().calls, 2);
        assert_eq!(trace.drain().len(), 2);
    }

    #[test]
    fn only_index_zero_is_used() {
        let (table, _trace, mut counter) = counter();
        counter.run(&KillArgs::new(1, SIGUSR1));
        for key in 1..8 {
            assert_eq!(table.snapshot(key).unwrap(), CallRecord::default());
        }
    }

    #[test]
    fn torn_down_table_reports_error() {
        let (table, trace, mut counter) = counter();
        table.teardown();
        assert_eq!(counter.run(&KillArgs::new(1, SIGUSR1)), 1);
        // A miss never reaches the table, torn down or not.
        assert_eq!(counter.run(&KillArgs::new(1, 9)), 0);
        assert!(trace.is_empty());
    }

    #[test]
    fn custom_target_signal() {
        let table = PerUnitTable::create("t", 1, 8).unwrap();
        let trace = Arc::new(TracePipe::default());
        let mut counter = SignalCounter::new(table.claim(0).unwrap(), Arc::clone(&trace), 12);

        counter.run(&KillArgs::new(1, SIGUSR1));
        counter.run(&KillArgs::new(1, 12));
        assert_eq!(table.snapshot(0).unwrap().calls, 1);
        assert_eq!(trace.drain()[0].message, "process received SIGUSR2");
    }

    #[traced_test]
    #[test]
    fn matched_event_is_traced() {
        let (_table, _trace, mut counter) = counter();
        counter.run(&KillArgs::new(7, SIGUSR1));
        assert!(logs_contain("process received SIGUSR1"));
    }

    #[test]
    fn signal_names() {
        assert_eq!(signal_name(SIGUSR1), Some("SIGUSR1"));
        assert_eq!(signal_name(64), None);
    }

    proptest! {
        #[test]
        fn non_matching_signals_never_mutate(
            sigs in proptest::collection::vec(
                any::<i64>().prop_filter("not the target", |s| *s != SIGUSR1),
                1000,
            )
        ) {
            let (table, trace, mut counter) = counter();
            for sig in sigs {
                prop_assert_eq!(
                    counter.try_record(&KillArgs::new(1, sig)),
                    Ok(EventOutcome::Ignored)
                );
            }
            prop_assert_eq!(table.snapshot(0).unwrap().calls, 0);
            prop_assert!(trace.is_empty());
        }
    }
}
