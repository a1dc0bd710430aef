//! ## statmap-core::registry
//! **Pin-by-name table namespace**
//!
//! Tables declared with [`Pinning::ByName`] are published under
//! `<root>/<name>`. A program that is replaced or reloaded with the same
//! [`MapDef`] attaches to the existing table and keeps its counts, and a
//! reader can attach by name at any time. Unpinning tears the table down.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::CountError;
use crate::record::CounterRecord;
use crate::table::PerUnitTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pinning {
    /// Private to the loader that created it.
    #[default]
    None,
    /// Published and reused by name.
    ByName,
}

/// Static description of a counter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDef {
    pub name: &'static str,
    pub max_entries: u32,
    pub pinning: Pinning,
}

impl MapDef {
    pub const fn new(name: &'static str, max_entries: u32, pinning: Pinning) -> Self {
        Self {
            name,
            max_entries,
            pinning,
        }
    }
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error("No table pinned at '{0}'")]
    NotPinned(String),

    #[error("Pinned table '{name}' is incompatible: {reason}")]
    Incompatible { name: String, reason: String },

    #[error("Pinned table '{name}' holds {found} records, expected {expected}")]
    RecordMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Table(#[from] CountError),
}

/// Type-erased view of a pinned table.
trait PinnedTable: Send + Sync {
    fn record_type(&self) -> &'static str;
    fn shape(&self) -> (usize, u32);
    fn teardown(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: CounterRecord> PinnedTable for PerUnitTable<R> {
    fn record_type(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    fn shape(&self) -> (usize, u32) {
        (self.num_units(), self.max_keys())
    }

    fn teardown(&self) {
        PerUnitTable::teardown(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub struct PinRegistry {
    root: PathBuf,
    pins: RwLock<HashMap<String, Arc<dyn PinnedTable>>>,
}

impl PinRegistry {
    pub const DEFAULT_ROOT: &'static str = "/sys/fs/bpf/statmap";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pins: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a table named `name` is published under.
    pub fn pin_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Attaches to the pinned table for `def`, or creates (and pins) it.
    pub fn load_or_create<R: CounterRecord>(
        &self,
        def: &MapDef,
        num_units: usize,
    ) -> Result<Arc<PerUnitTable<R>>, PinError> {
        if def.pinning == Pinning::None {
            debug!(map = def.name, "Creating private table");
            return Ok(PerUnitTable::create(def.name, num_units, def.max_entries)?);
        }

        let mut pins = self.pins.write();
        if let Some(existing) = pins.get(def.name) {
            let (units, keys) = existing.shape();
            if units != num_units || keys != def.max_entries {
                return Err(PinError::Incompatible {
                    name: def.name.to_string(),
                    reason: format!(
                        "pinned as {units} units x {keys} keys, requested {num_units} x {}",
                        def.max_entries
                    ),
                });
            }
            let table = downcast::<R>(def.name, existing)?;
            info!(map = def.name, path = ?self.pin_path(def.name), "Reusing pinned table");
            return Ok(table);
        }

        let table = PerUnitTable::<R>::create(def.name, num_units, def.max_entries)?;
        pins.insert(def.name.to_string(), table.clone());
        info!(
            map = def.name,
            path = ?self.pin_path(def.name),
            num_units,
            max_entries = def.max_entries,
            "Pinned table"
        );
        Ok(table)
    }

    /// Attaches to an already pinned table.
    pub fn open<R: CounterRecord>(&self, name: &str) -> Result<Arc<PerUnitTable<R>>, PinError> {
        let pins = self.pins.read();
        let pinned = pins
            .get(name)
            .ok_or_else(|| PinError::NotPinned(self.pin_path(name).display().to_string()))?;
        downcast::<R>(name, pinned)
    }

    /// Removes the pin and tears the table down.
    pub fn unpin(&self, name: &str) -> Result<(), PinError> {
        let pinned = self
            .pins
            .write()
            .remove(name)
            .ok_or_else(|| PinError::NotPinned(self.pin_path(name).display().to_string()))?;
        pinned.teardown();
        info!(map = name, "Unpinned table");
        Ok(())
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pins.read().contains_key(name)
    }

    /// Pinned table names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pins.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}

fn downcast<R: CounterRecord>(
    name: &str,
    pinned: &Arc<dyn PinnedTable>,
) -> Result<Arc<PerUnitTable<R>>, PinError> {
    let found = pinned.record_type();
    Arc::clone(pinned)
        .into_any()
        .downcast::<PerUnitTable<R>>()
        .map_err(|_| PinError::RecordMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<R>(),
            found,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CallRecord, PacketRecord};

    const STATS: MapDef = MapDef::new("stats", 4, Pinning::ByName);

    #[test]
    fn reload_reuses_pinned_table() {
        let registry = PinRegistry::new("/tmp/pins");
        {
            let table = registry.load_or_create::<CallRecord>(&STATS, 2).unwrap();
            let mut writer = table.claim(0).unwrap();
            writer.get_or_fail(0).unwrap().calls += 5;
        }

        let reloaded = registry.load_or_create::<CallRecord>(&STATS, 2).unwrap();
        let mut writer = reloaded.claim(0).unwrap();
        writer.get_or_fail(0).unwrap().calls += 1;
        assert_eq!(reloaded.snapshot(0).unwrap().calls, 6);
    }

    #[test]
    fn reader_attaches_by_name() {
        let registry = PinRegistry::default();
        let table = registry.load_or_create::<PacketRecord>(&STATS, 1).unwrap();
        let reader = registry.open::<PacketRecord>("stats").unwrap();
        assert!(Arc::ptr_eq(&table, &reader));
        assert_eq!(registry.names(), vec!["stats".to_string()]);
        assert_eq!(
            registry.pin_path("stats"),
            PathBuf::from("/sys/fs/bpf/statmap/stats")
        );
    }

    #[test]
    fn shape_mismatch_is_incompatible() {
        let registry = PinRegistry::default();
        registry.load_or_create::<CallRecord>(&STATS, 2).unwrap();
        let bigger = MapDef::new("stats", 8, Pinning::ByName);
        assert!(matches!(
            registry.load_or_create::<CallRecord>(&bigger, 2),
            Err(PinError::Incompatible { .. })
        ));
        assert!(matches!(
            registry.load_or_create::<CallRecord>(&STATS, 3),
            Err(PinError::Incompatible { .. })
        ));
    }

    #[test]
    fn record_type_mismatch() {
        let registry = PinRegistry::default();
        registry.load_or_create::<CallRecord>(&STATS, 1).unwrap();
        assert!(matches!(
            registry.open::<PacketRecord>("stats"),
            Err(PinError::RecordMismatch { .. })
        ));
    }

    #[test]
    fn unpin_tears_down() {
        let registry = PinRegistry::default();
        let table = registry.load_or_create::<CallRecord>(&STATS, 1).unwrap();
        let mut writer = table.claim(0).unwrap();

        registry.unpin("stats").unwrap();
        assert!(!registry.is_pinned("stats"));
        assert!(matches!(
            writer.get_or_fail(0),
            Err(CountError::TableUnavailable { .. })
        ));
        assert!(matches!(
            registry.open::<CallRecord>("stats"),
            Err(PinError::NotPinned(_))
        ));
        assert!(registry.unpin("stats").is_err());
    }

    #[test]
    fn unpinned_defs_stay_private() {
        let registry = PinRegistry::default();
        let private = MapDef::new("scratch", 2, Pinning::None);
        let a = registry.load_or_create::<CallRecord>(&private, 1).unwrap();
        let b = registry.load_or_create::<CallRecord>(&private, 1).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(registry.names().is_empty());
    }

    #[test]
    fn zero_capacity_def_fails() {
        let registry = PinRegistry::default();
        let empty = MapDef::new("empty", 0, Pinning::ByName);
        assert!(matches!(
            registry.load_or_create::<CallRecord>(&empty, 1),
            Err(PinError::Table(CountError::Capacity { .. }))
        ));
        assert!(!registry.is_pinned("empty"));
    }
}
