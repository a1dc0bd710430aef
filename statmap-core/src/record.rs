//! ## statmap-core::record
//! **Fixed-layout counter records**
//!
//! Records are `#[repr(C)]` so their layout matches the value type of the
//! kernel-side per-CPU arrays they mirror. Inside a [`PerUnitTable`] every
//! field lives in its own `AtomicU64` slot; a record is loaded from and
//! stored back to those slots as a whole.
//!
//! [`PerUnitTable`]: crate::table::PerUnitTable

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A plain-old-data counter record made of `u64` fields.
pub trait CounterRecord: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Number of `u64` fields, i.e. slots per key.
    const FIELDS: usize;

    /// Field names in slot order, used for metric labels.
    const FIELD_NAMES: &'static [&'static str];

    /// Reads a record from its slots.
    fn load(slots: &[AtomicU64]) -> Self;

    /// Writes a record back to its slots.
    fn store(&self, slots: &[AtomicU64]);

    /// Field-wise wrapping addition of `other` into `self`.
    fn merge(&mut self, other: &Self);

    /// Value of field `index` (slot order).
    fn field(&self, index: usize) -> u64;
}

/// Per-action packet tally of the classifier programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PacketRecord {
    pub rx_packets: u64,
    pub rx_bytes: u64,
}

impl PacketRecord {
    pub const fn new(rx_packets: u64, rx_bytes: u64) -> Self {
        Self {
            rx_packets,
            rx_bytes,
        }
    }
}

impl CounterRecord for PacketRecord {
    const FIELDS: usize = 2;
    const FIELD_NAMES: &'static [&'static str] = &["rx_packets", "rx_bytes"];

    #[inline]
    fn load(slots: &[AtomicU64]) -> Self {
        Self {
            rx_packets: slots[0].load(Ordering::Relaxed),
            rx_bytes: slots[1].load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn store(&self, slots: &[AtomicU64]) {
        slots[0].store(self.rx_packets, Ordering::Relaxed);
        slots[1].store(self.rx_bytes, Ordering::Relaxed);
    }

    fn merge(&mut self, other: &Self) {
        self.rx_packets = self.rx_packets.wrapping_add(other.rx_packets);
        self.rx_bytes = self.rx_bytes.wrapping_add(other.rx_bytes);
    }

    fn field(&self, index: usize) -> u64 {
        match index {
            0 => self.rx_packets,
            1 => self.rx_bytes,
            _ => 0,
        }
    }
}

/// Invocation tally of the event and probe programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CallRecord {
    pub calls: u64,
}

impl CallRecord {
    pub const fn new(calls: u64) -> Self {
        Self { calls }
    }
}

impl CounterRecord for CallRecord {
    const FIELDS: usize = 1;
    const FIELD_NAMES: &'static [&'static str] = &["calls"];

    #[inline]
    fn load(slots: &[AtomicU64]) -> Self {
        Self {
            calls: slots[0].load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn store(&self, slots: &[AtomicU64]) {
        slots[0].store(self.calls, Ordering::Relaxed);
    }

    fn merge(&mut self, other: &Self) {
        self.calls = self.calls.wrapping_add(other.calls);
    }

    fn field(&self, index: usize) -> u64 {
        match index {
            0 => self.calls,
            _ => 0,
        }
    }
}

// The `bpffs` reader hands these types to aya's typed map API. Kept behind
// the feature so default builds don't pull in the loader stack.
#[cfg(feature = "bpffs")]
mod pod_impls {
    use super::{CallRecord, PacketRecord};

    unsafe impl aya::Pod for PacketRecord {}
    unsafe impl aya::Pod for CallRecord {}
}
