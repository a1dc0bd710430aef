//! Unconditional invocation counter for kprobe and uretprobe attachments.

use std::sync::Arc;

use crate::error::CountError;
use crate::record::CallRecord;
use crate::table::UnitWriter;
use crate::trace::TracePipe;

const COUNTER_INDEX: u32 = 0;

pub struct ProbeCounter {
    writer: UnitWriter<CallRecord>,
    trace: Arc<TracePipe>,
    message: &'static str,
}

impl ProbeCounter {
    pub fn new(
        writer: UnitWriter<CallRecord>,
        trace: Arc<TracePipe>,
        message: &'static str,
    ) -> Self {
        Self {
            writer,
            trace,
            message,
        }
    }

    pub fn kprobe(writer: UnitWriter<CallRecord>, trace: Arc<TracePipe>) -> Self {
        Self::new(writer, trace, "kprobe called")
    }

    pub fn uretprobe(writer: UnitWriter<CallRecord>, trace: Arc<TracePipe>) -> Self {
        Self::new(writer, trace, "uretprobe called")
    }

    pub fn unit(&self) -> usize {
        self.writer.unit()
    }

    #[inline]
    pub fn try_record(&mut self) -> Result<(), CountError> {
        {
            let mut rec = self.writer.get_or_fail(COUNTER_INDEX)?;
            rec.calls = rec.calls.wrapping_add(1);
        }
        self.trace.emit(self.writer.unit(), self.message);
        Ok(())
    }

    /// Program entry point: 0 on success, 1 on error.
    #[inline]
    pub fn run(&mut self) -> u32 {
        match self.try_record() {
            Ok(()) => 0,
            Err(_) => 1,
        }
    }
}
