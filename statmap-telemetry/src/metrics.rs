//! ## statmap-telemetry::metrics
//! **Prometheus exporter for table snapshots**
//!
//! Snapshots are exported as gauges labelled by map, key and field. The
//! reader sets them from summed values on every poll; nothing here runs on
//! the counting path.

use prometheus::{
    Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use statmap_core::record::CounterRecord;
use statmap_core::table::PerUnitTable;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub counter_value: IntGaugeVec,
    pub invocations: IntCounterVec,
    pub rejects: IntCounterVec,
    pub trace_dropped: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let counter_value = IntGaugeVec::new(
            Opts::new(
                "statmap_counter_value",
                "Counter table values summed across processing units",
            ),
            &["map", "key", "field"],
        )?;
        let invocations = IntCounterVec::new(
            Opts::new(
                "statmap_invocations_total",
                "Program invocations seen by the driver",
            ),
            &["program"],
        )?;
        let rejects = IntCounterVec::new(
            Opts::new(
                "statmap_rejects_total",
                "Program invocations that returned a reject outcome",
            ),
            &["program", "reason"],
        )?;
        let trace_dropped = IntGauge::new(
            "statmap_trace_dropped",
            "Diagnostic trace records dropped because the pipe was full",
        )?;

        registry.register(Box::new(counter_value.clone()))?;
        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(rejects.clone()))?;
        registry.register(Box::new(trace_dropped.clone()))?;

        Ok(Self {
            registry,
            counter_value,
            invocations,
            rejects,
            trace_dropped,
        })
    }

    /// Publishes the summed value of every key of `table`.
    ///
    /// `key_label` names a key, e.g. with its verdict name.
    pub fn record_table<R, F>(&self, table: &PerUnitTable<R>, key_label: F)
    where
        R: CounterRecord,
        F: Fn(u32) -> String,
    {
        for key in 0..table.max_keys() {
            let Ok(record) = table.snapshot(key) else {
                continue;
            };
            let label = key_label(key);
            for (index, field) in R::FIELD_NAMES.iter().enumerate() {
                self.counter_value
                    .with_label_values(&[table.name(), label.as_str(), *field])
                    .set(saturating_i64(record.field(index)));
            }
        }
    }

    pub fn inc_invocations(&self, program: &str, count: u64) {
        self.invocations.with_label_values(&[program]).inc_by(count);
    }

    pub fn inc_rejects(&self, program: &str, reason: &str, count: u64) {
        self.rejects
            .with_label_values(&[program, reason])
            .inc_by(count);
    }

    pub fn set_trace_dropped(&self, dropped: u64) {
        self.trace_dropped.set(saturating_i64(dropped));
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Gauges are signed; counts past `i64::MAX` are clamped instead of wrapping.
fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
