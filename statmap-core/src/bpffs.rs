//! ## statmap-core::bpffs
//! **Reader for kernel-pinned per-CPU arrays**
//!
//! Attaches to a `BPF_MAP_TYPE_PERCPU_ARRAY` pinned on the BPF filesystem
//! and reads one key, the way a user-space reader polls the maps the
//! kernel-side counting programs update.

use std::path::Path;

use aya::maps::{Map, MapData, MapError, PerCpuArray};
use thiserror::Error;

use crate::record::CounterRecord;

#[derive(Debug, Error)]
pub enum BpffsError {
    #[error("Failed to open pinned map {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: MapError,
    },

    #[error("Failed to read key {key} of {path}: {source}")]
    Read {
        path: String,
        key: u32,
        #[source]
        source: MapError,
    },
}

/// Per-CPU values of `key` in the pinned per-CPU array at `path`.
pub fn read_pinned<R>(path: impl AsRef<Path>, key: u32) -> Result<Vec<R>, BpffsError>
where
    R: CounterRecord + aya::Pod,
{
    let path = path.as_ref();
    let display = path.display().to_string();

    let data = MapData::from_pin(path).map_err(|source| BpffsError::Open {
        path: display.clone(),
        source,
    })?;
    let array: PerCpuArray<MapData, R> =
        PerCpuArray::try_from(Map::PerCpuArray(data)).map_err(|source| BpffsError::Open {
            path: display.clone(),
            source,
        })?;

    let values = array.get(&key, 0).map_err(|source| BpffsError::Read {
        path: display,
        key,
        source,
    })?;
    Ok(values.iter().copied().collect())
}

/// Sum across CPUs of `key` in the pinned per-CPU array at `path`.
pub fn sum_pinned<R>(path: impl AsRef<Path>, key: u32) -> Result<R, BpffsError>
where
    R: CounterRecord + aya::Pod,
{
    let mut total = R::default();
    for value in read_pinned::<R>(path, key)? {
        total.merge(&value);
    }
    Ok(total)
}
