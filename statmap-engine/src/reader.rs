//! Out-of-band reader of the pinned counter tables.

use std::sync::Arc;

use tracing::info;

use statmap_core::prelude::*;
use statmap_telemetry::MetricsRecorder;

use crate::error::EngineError;

/// Summed per-action packet stats of one classifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierStats {
    pub map: &'static str,
    pub per_action: Vec<(u32, &'static str, PacketRecord)>,
}

impl ClassifierStats {
    fn read<A: ActionSet>(
        table: &PerUnitTable<PacketRecord>,
        map: &'static str,
    ) -> Result<Self, CountError> {
        let per_action = (0..table.max_keys())
            .map(|code| {
                let name = A::action_name(code).unwrap_or("UNKNOWN");
                table.snapshot(code).map(|record| (code, name, record))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { map, per_action })
    }

    pub fn action(&self, code: u32) -> Option<PacketRecord> {
        self.per_action
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, _, record)| *record)
    }

    pub fn total(&self) -> PacketRecord {
        self.per_action
            .iter()
            .fold(PacketRecord::default(), |mut acc, (_, _, record)| {
                acc.merge(record);
                acc
            })
    }
}

/// One reading of every pinned program table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub xdp: Option<ClassifierStats>,
    pub tc: Option<ClassifierStats>,
    pub tracepoint_calls: Option<u64>,
    pub kprobe_calls: Option<u64>,
    pub uretprobe_calls: Option<u64>,
}

impl StatsReport {
    pub fn log(&self) {
        for stats in [&self.xdp, &self.tc].into_iter().flatten() {
            for (code, name, record) in &stats.per_action {
                if record.rx_packets == 0 {
                    continue;
                }
                info!(
                    map = stats.map,
                    action = name,
                    code,
                    "{}: rx_packets: {}, rx_bytes: {}",
                    name,
                    record.rx_packets,
                    record.rx_bytes
                );
            }
        }
        if let Some(count) = self.tracepoint_calls {
            info!("Tracepoint: count: {}", count);
        }
        if let Some(count) = self.kprobe_calls {
            info!("Kprobe: count: {}", count);
        }
        if let Some(count) = self.uretprobe_calls {
            info!("Uretprobe: count: {}", count);
        }
    }
}

/// Reads the summed values of every pinned table that exists.
pub struct StatsReader {
    registry: Arc<PinRegistry>,
}

impl StatsReader {
    pub fn new(registry: Arc<PinRegistry>) -> Self {
        Self { registry }
    }

    pub fn report(&self) -> Result<StatsReport, EngineError> {
        Ok(StatsReport {
            xdp: self
                .open::<PacketRecord>(XDP_STATS_MAP.name)?
                .map(|t| ClassifierStats::read::<Xdp>(&t, XDP_STATS_MAP.name))
                .transpose()?,
            tc: self
                .open::<PacketRecord>(TC_STATS_MAP.name)?
                .map(|t| ClassifierStats::read::<Tc>(&t, TC_STATS_MAP.name))
                .transpose()?,
            tracepoint_calls: self.calls(TRACEPOINT_STATS_MAP.name, 0)?,
            kprobe_calls: self.calls(KPROBE_STATS_MAP.name, 0)?,
            uretprobe_calls: self.calls(URETPROBE_STATS_MAP.name, 0)?,
        })
    }

    /// Publishes every pinned table through `metrics`.
    pub fn export(&self, metrics: &MetricsRecorder) -> Result<(), EngineError> {
        if let Some(table) = self.open::<PacketRecord>(XDP_STATS_MAP.name)? {
            metrics.record_table(&table, |code| {
                Xdp::action_name(code).unwrap_or("UNKNOWN").to_string()
            });
        }
        if let Some(table) = self.open::<PacketRecord>(TC_STATS_MAP.name)? {
            metrics.record_table(&table, |code| {
                Tc::action_name(code).unwrap_or("UNKNOWN").to_string()
            });
        }
        for def in [&TRACEPOINT_STATS_MAP, &KPROBE_STATS_MAP, &URETPROBE_STATS_MAP] {
            if let Some(table) = self.open::<CallRecord>(def.name)? {
                metrics.record_table(&table, |key| key.to_string());
            }
        }
        Ok(())
    }

    fn open<R: CounterRecord>(
        &self,
        name: &str,
    ) -> Result<Option<Arc<PerUnitTable<R>>>, EngineError> {
        if !self.registry.is_pinned(name) {
            return Ok(None);
        }
        match self.registry.open::<R>(name) {
            Ok(table) => Ok(Some(table)),
            // Unpinned between the check and the open.
            Err(PinError::NotPinned(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn calls(&self, name: &str, key: u32) -> Result<Option<u64>, EngineError> {
        self.open::<CallRecord>(name)?
            .map(|t| t.snapshot(key).map(|record| record.calls))
            .transpose()
            .map_err(EngineError::from)
    }
}
