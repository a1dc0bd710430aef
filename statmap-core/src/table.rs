//! ## statmap-core::table
//! **Bounded per-unit counter table**
//!
//! A table holds `num_units` independent mappings of `max_keys` records,
//! all allocated and zeroed at creation. Nothing on the counting path
//! allocates, resizes or inserts: a key outside the table is an error.
//!
//! Writers claim one processing unit at a time through [`UnitWriter`], so
//! every unit's records have exactly one writer. Readers reduce across units
//! with relaxed loads and may observe an in-flight update of another unit;
//! that is fine for telemetry.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::CountError;
use crate::record::CounterRecord;

const SLOTS_PER_LINE: usize = 8;

/// Cache-line aligned block of slots so that two units never share a line.
#[repr(C, align(64))]
struct CacheLine([AtomicU64; SLOTS_PER_LINE]);

impl CacheLine {
    fn zeroed() -> Self {
        Self(std::array::from_fn(|_| AtomicU64::new(0)))
    }
}

/// Fixed-capacity `units × keys` table of counter records.
pub struct PerUnitTable<R: CounterRecord> {
    name: Arc<str>,
    num_units: usize,
    max_keys: u32,
    /// Slots per unit, rounded up to whole cache lines.
    unit_stride: usize,
    lines: Box<[CacheLine]>,
    claims: Box<[AtomicBool]>,
    live: AtomicBool,
    _record: PhantomData<fn() -> R>,
}

impl<R: CounterRecord> PerUnitTable<R> {
    /// Allocates a zero-filled table.
    ///
    /// Fails with [`CountError::Capacity`] when either dimension is zero.
    pub fn create(
        name: impl Into<Arc<str>>,
        num_units: usize,
        max_keys: u32,
    ) -> Result<Arc<Self>, CountError> {
        if num_units == 0 || max_keys == 0 {
            return Err(CountError::Capacity {
                num_units,
                max_keys,
            });
        }

        let unit_slots = max_keys as usize * R::FIELDS;
        let unit_lines = unit_slots.div_ceil(SLOTS_PER_LINE);
        let lines = (0..num_units * unit_lines)
            .map(|_| CacheLine::zeroed())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let claims = (0..num_units)
            .map(|_| AtomicBool::new(false))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Arc::new(Self {
            name: name.into(),
            num_units,
            max_keys,
            unit_stride: unit_lines * SLOTS_PER_LINE,
            lines,
            claims,
            live: AtomicBool::new(true),
            _record: PhantomData,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn max_keys(&self) -> u32 {
        self.max_keys
    }

    /// `false` once the table has been torn down.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Takes the exclusive writer for `unit`.
    ///
    /// The claim is released when the returned writer is dropped, so a
    /// reloaded program can attach to the same unit again.
    pub fn claim(self: &Arc<Self>, unit: usize) -> Result<UnitWriter<R>, CountError> {
        if unit >= self.num_units {
            return Err(CountError::UnitOutOfRange {
                unit,
                num_units: self.num_units,
            });
        }
        if !self.is_live() {
            return Err(self.unavailable());
        }
        if self.claims[unit]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CountError::UnitBusy { unit });
        }

        Ok(UnitWriter {
            table: Arc::clone(self),
            unit,
        })
    }

    /// Sum of the record at `key` across all units.
    pub fn snapshot(&self, key: u32) -> Result<R, CountError> {
        self.check_key(key)?;
        let mut total = R::default();
        for unit in 0..self.num_units {
            total.merge(&R::load(self.record_slots(unit, key)));
        }
        Ok(total)
    }

    /// Raw per-unit values of the record at `key`, indexed by unit.
    pub fn per_unit(&self, key: u32) -> Result<Vec<R>, CountError> {
        self.check_key(key)?;
        Ok((0..self.num_units)
            .map(|unit| R::load(self.record_slots(unit, key)))
            .collect())
    }

    /// Marks the table unavailable for writers. Snapshots stay readable.
    pub fn teardown(&self) {
        self.live.store(false, Ordering::Release);
    }

    #[inline]
    fn check_key(&self, key: u32) -> Result<(), CountError> {
        if key >= self.max_keys {
            return Err(CountError::KeyOutOfRange {
                key,
                max_keys: self.max_keys,
            });
        }
        Ok(())
    }

    #[inline]
    fn unavailable(&self) -> CountError {
        CountError::TableUnavailable {
            name: Arc::clone(&self.name),
        }
    }

    #[inline]
    fn slots(&self) -> &[AtomicU64] {
        // SAFETY: `CacheLine` is `repr(C)` over `[AtomicU64; 8]` with an
        // alignment of 64, which equals its size, so the lines are a gapless
        // run of `len * 8` atomics.
        unsafe {
            std::slice::from_raw_parts(
                self.lines.as_ptr() as *const AtomicU64,
                self.lines.len() * SLOTS_PER_LINE,
            )
        }
    }

    #[inline]
    fn record_slots(&self, unit: usize, key: u32) -> &[AtomicU64] {
        let start = unit * self.unit_stride + key as usize * R::FIELDS;
        &self.slots()[start..start + R::FIELDS]
    }
}

impl<R: CounterRecord> std::fmt::Debug for PerUnitTable<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerUnitTable")
            .field("name", &self.name)
            .field("num_units", &self.num_units)
            .field("max_keys", &self.max_keys)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Exclusive writer for one processing unit of a table.
pub struct UnitWriter<R: CounterRecord> {
    table: Arc<PerUnitTable<R>>,
    unit: usize,
}

impl<R: CounterRecord> UnitWriter<R> {
    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn table(&self) -> &Arc<PerUnitTable<R>> {
        &self.table
    }

    /// Mutable access to this unit's record at `key`. Never inserts.
    #[inline]
    pub fn get_or_fail(&mut self, key: u32) -> Result<RecordMut<'_, R>, CountError> {
        self.table.check_key(key)?;
        if !self.table.is_live() {
            return Err(self.table.unavailable());
        }
        let slots = self.table.record_slots(self.unit, key);
        Ok(RecordMut {
            slots,
            value: R::load(slots),
        })
    }
}

impl<R: CounterRecord> Drop for UnitWriter<R> {
    fn drop(&mut self) {
        self.table.claims[self.unit].store(false, Ordering::Release);
    }
}

impl<R: CounterRecord> std::fmt::Debug for UnitWriter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitWriter")
            .field("table", &self.table.name())
            .field("unit", &self.unit)
            .finish()
    }
}

/// Borrowed record of one unit; changes are written back on drop.
pub struct RecordMut<'a, R: CounterRecord> {
    slots: &'a [AtomicU64],
    value: R,
}

impl<R: CounterRecord> Deref for RecordMut<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.value
    }
}

impl<R: CounterRecord> DerefMut for RecordMut<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.value
    }
}

impl<R: CounterRecord> Drop for RecordMut<'_, R> {
    #[inline]
    fn drop(&mut self) {
        self.value.store(self.slots);
    }
}
