//! ## statmap-core::trace
//! **Best-effort diagnostic pipe**
//!
//! Matched events leave a one-line, human-readable trace record. Emitting
//! never blocks or allocates: when the pipe is full the record is dropped
//! and counted. Every record is also forwarded to `tracing` at debug level.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam::queue::ArrayQueue;

/// One diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Processing unit that emitted the record.
    pub unit: usize,
    pub message: &'static str,
    /// Nanoseconds since the pipe was created.
    pub timestamp_ns: u64,
}

/// Bounded multi-producer trace pipe.
pub struct TracePipe {
    queue: ArrayQueue<TraceRecord>,
    dropped: AtomicU64,
    epoch: Instant,
}

impl TracePipe {
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// # Panics
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    /// Fire-and-forget emit.
    #[inline]
    pub fn emit(&self, unit: usize, message: &'static str) {
        tracing::debug!(unit, "{}", message);
        let record = TraceRecord {
            unit,
            message,
            timestamp_ns: self.epoch.elapsed().as_nanos() as u64,
        };
        if self.queue.push(record).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Takes every pending record, oldest first.
    pub fn drain(&self) -> Vec<TraceRecord> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    /// Records lost because the pipe was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for TracePipe {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_records_in_order() {
        let pipe = TracePipe::with_capacity(8);
        pipe.emit(0, "first");
        pipe.emit(3, "second");

        let records = pipe.drain();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].unit, records[0].message), (0, "first"));
        assert_eq!((records[1].unit, records[1].message), (3, "second"));
        assert!(records[0].timestamp_ns <= records[1].timestamp_ns);
        assert!(pipe.is_empty());
    }

    #[test]
    fn full_pipe_drops_and_counts() {
        let pipe = TracePipe::with_capacity(2);
        for _ in 0..5 {
            pipe.emit(0, "kprobe called");
        }
        assert_eq!(pipe.len(), 2);
        assert_eq!(pipe.dropped(), 3);
    }
}
