//! Driver-side bookkeeping of what each program returned.

use std::collections::BTreeMap;

use statmap_core::CountError;
use statmap_telemetry::MetricsRecorder;

/// What a single invocation amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Counted,
    Ignored,
    Rejected(&'static str),
}

impl Observed {
    pub fn from_result<T>(result: &Result<T, CountError>) -> Self {
        match result {
            Ok(_) => Observed::Counted,
            Err(e) => Observed::Rejected(e.reason()),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgramTally {
    pub invocations: u64,
    pub counted: u64,
    pub ignored: u64,
    pub rejects: BTreeMap<&'static str, u64>,
}

impl ProgramTally {
    pub fn rejected(&self) -> u64 {
        self.rejects.values().sum()
    }

    fn merge(&mut self, other: &ProgramTally) {
        self.invocations += other.invocations;
        self.counted += other.counted;
        self.ignored += other.ignored;
        for (reason, count) in &other.rejects {
            *self.rejects.entry(*reason).or_default() += count;
        }
    }
}

/// Per-program outcome counts, keyed by program name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DriverTally {
    pub programs: BTreeMap<&'static str, ProgramTally>,
}

impl DriverTally {
    #[inline]
    pub fn observe(&mut self, program: &'static str, observed: Observed) {
        let tally = self.programs.entry(program).or_default();
        tally.invocations += 1;
        match observed {
            Observed::Counted => tally.counted += 1,
            Observed::Ignored => tally.ignored += 1,
            Observed::Rejected(reason) => *tally.rejects.entry(reason).or_default() += 1,
        }
    }

    pub fn program(&self, program: &str) -> Option<&ProgramTally> {
        self.programs.get(program)
    }

    pub fn merge(&mut self, other: &DriverTally) {
        for (program, tally) in &other.programs {
            self.programs.entry(*program).or_default().merge(tally);
        }
    }

    pub fn export(&self, metrics: &MetricsRecorder) {
        for (program, tally) in &self.programs {
            metrics.inc_invocations(program, tally.invocations);
            for (reason, count) in &tally.rejects {
                metrics.inc_rejects(program, reason, *count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_and_merge() {
        let mut a = DriverTally::default();
        a.observe("xdp", Observed::Counted);
        a.observe("xdp", Observed::Rejected("malformed_input"));

        let mut b = DriverTally::default();
        b.observe("xdp", Observed::Rejected("malformed_input"));
        b.observe("tracepoint", Observed::Ignored);

        a.merge(&b);
        let xdp = a.program("xdp").unwrap();
        assert_eq!(xdp.invocations, 3);
        assert_eq!(xdp.counted, 1);
        assert_eq!(xdp.rejected(), 2);
        assert_eq!(a.program("tracepoint").unwrap().ignored, 1);
    }
}
