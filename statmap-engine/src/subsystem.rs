//! Table lifecycle and per-unit program attachment.

use std::sync::Arc;

use tracing::{info, warn};

use statmap_config::StatmapConfig;
use statmap_core::prelude::*;

use crate::error::EngineError;
use crate::tally::{DriverTally, Observed};
use crate::workload::Workload;

/// The pinned tables of every enabled program plus the shared trace pipe.
pub struct Subsystem {
    registry: Arc<PinRegistry>,
    trace: Arc<TracePipe>,
    num_units: usize,
    target_signal: i64,
    xdp: Option<Arc<PerUnitTable<PacketRecord>>>,
    tc: Option<Arc<PerUnitTable<PacketRecord>>>,
    tracepoint: Option<Arc<PerUnitTable<CallRecord>>>,
    kprobe: Option<Arc<PerUnitTable<CallRecord>>>,
    uretprobe: Option<Arc<PerUnitTable<CallRecord>>>,
}

/// Unpins the tables a failed [`Subsystem::start`] created, newest first.
///
/// Tables that were already pinned before the call are left alone.
struct PinRollback<'a> {
    registry: &'a PinRegistry,
    created: Vec<&'static str>,
}

impl<'a> PinRollback<'a> {
    fn new(registry: &'a PinRegistry) -> Self {
        Self {
            registry,
            created: Vec::new(),
        }
    }

    fn load<R: CounterRecord>(
        &mut self,
        enabled: bool,
        def: &MapDef,
        num_units: usize,
    ) -> Result<Option<Arc<PerUnitTable<R>>>, PinError> {
        if !enabled {
            return Ok(None);
        }
        let existed = self.registry.is_pinned(def.name);
        let table = self.registry.load_or_create::<R>(def, num_units)?;
        if !existed {
            self.created.push(def.name);
        }
        Ok(Some(table))
    }

    fn commit(mut self) {
        self.created.clear();
    }
}

impl Drop for PinRollback<'_> {
    fn drop(&mut self) {
        for name in self.created.drain(..).rev() {
            match self.registry.unpin(name) {
                Ok(()) => warn!(map = name, "Unpinned table after failed start"),
                Err(e) => warn!(map = name, "Failed to unpin table after failed start: {}", e),
            }
        }
    }
}

impl Subsystem {
    /// Creates (or attaches to) the tables of the enabled programs.
    ///
    /// On failure, tables pinned by this call are unpinned again.
    pub fn start(config: &StatmapConfig, registry: Arc<PinRegistry>) -> Result<Self, EngineError> {
        let units = config.tables.num_units;
        let programs = &config.programs;

        let mut pins = PinRollback::new(&registry);
        let xdp = pins.load::<PacketRecord>(programs.xdp.enabled, &XDP_STATS_MAP, units)?;
        let tc = pins.load::<PacketRecord>(programs.tc.enabled, &TC_STATS_MAP, units)?;
        let tracepoint =
            pins.load::<CallRecord>(programs.tracepoint.enabled, &TRACEPOINT_STATS_MAP, units)?;
        let kprobe = pins.load::<CallRecord>(programs.kprobe.enabled, &KPROBE_STATS_MAP, units)?;
        let uretprobe =
            pins.load::<CallRecord>(programs.uretprobe.enabled, &URETPROBE_STATS_MAP, units)?;
        pins.commit();

        if programs.xdp.enabled {
            info!(interface = %programs.xdp.interface, "xdp_stats attached");
        }
        if programs.tc.enabled {
            info!(interface = %programs.tc.interface, "tc stats classifier attached");
        }
        if programs.tracepoint.enabled {
            info!(
                signal = programs.tracepoint.target_signal,
                name = signal_name(programs.tracepoint.target_signal).unwrap_or("?"),
                "tracepoint_kill_recorder attached"
            );
        }
        if programs.kprobe.enabled {
            info!(function = %programs.kprobe.fn_name, "kprobe_counter attached");
        }
        if programs.uretprobe.enabled {
            info!(
                target = %programs.uretprobe.target,
                function = %programs.uretprobe.fn_name,
                "uretprobe_counter attached"
            );
        }

        Ok(Self {
            registry,
            trace: Arc::new(TracePipe::with_capacity(config.telemetry.trace_capacity)),
            num_units: units,
            target_signal: programs.tracepoint.target_signal,
            xdp,
            tc,
            tracepoint,
            kprobe,
            uretprobe,
        })
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn registry(&self) -> &Arc<PinRegistry> {
        &self.registry
    }

    pub fn trace(&self) -> &Arc<TracePipe> {
        &self.trace
    }

    pub fn target_signal(&self) -> i64 {
        self.target_signal
    }

    /// Claims unit `unit` of every table and builds its programs.
    pub fn attach_unit(&self, unit: usize) -> Result<UnitPrograms, EngineError> {
        Ok(UnitPrograms {
            unit,
            xdp: self
                .xdp
                .as_ref()
                .map(|t| t.claim(unit).map(ClassifierCounter::new))
                .transpose()?,
            tc: self
                .tc
                .as_ref()
                .map(|t| t.claim(unit).map(ClassifierCounter::new))
                .transpose()?,
            signal: self
                .tracepoint
                .as_ref()
                .map(|t| {
                    t.claim(unit).map(|w| {
                        SignalCounter::new(w, Arc::clone(&self.trace), self.target_signal)
                    })
                })
                .transpose()?,
            kprobe: self
                .kprobe
                .as_ref()
                .map(|t| {
                    t.claim(unit)
                        .map(|w| ProbeCounter::kprobe(w, Arc::clone(&self.trace)))
                })
                .transpose()?,
            uretprobe: self
                .uretprobe
                .as_ref()
                .map(|t| {
                    t.claim(unit)
                        .map(|w| ProbeCounter::uretprobe(w, Arc::clone(&self.trace)))
                })
                .transpose()?,
        })
    }

    /// Unpins every table this subsystem brought up.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let names = [
            self.xdp.as_ref().map(|t| t.name().to_string()),
            self.tc.as_ref().map(|t| t.name().to_string()),
            self.tracepoint.as_ref().map(|t| t.name().to_string()),
            self.kprobe.as_ref().map(|t| t.name().to_string()),
            self.uretprobe.as_ref().map(|t| t.name().to_string()),
        ];
        for name in names.into_iter().flatten() {
            if self.registry.is_pinned(&name) {
                self.registry.unpin(&name)?;
            }
        }
        info!("Counter tables unpinned");
        Ok(())
    }
}

/// The programs of one processing unit.
pub struct UnitPrograms {
    unit: usize,
    xdp: Option<ClassifierCounter<Xdp>>,
    tc: Option<ClassifierCounter<Tc>>,
    signal: Option<SignalCounter>,
    kprobe: Option<ProbeCounter>,
    uretprobe: Option<ProbeCounter>,
}

impl UnitPrograms {
    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Feeds `events` generated invocations to every attached program.
    pub fn drive(&mut self, workload: &mut Workload, events: usize, tally: &mut DriverTally) {
        for _ in 0..events {
            if let Some(xdp) = self.xdp.as_mut() {
                let ctx = workload.packet();
                let action = workload.action::<Xdp>();
                tally.observe(Xdp::NAME, Observed::from_result(&xdp.record_action(&ctx, action)));
            }
            if let Some(tc) = self.tc.as_mut() {
                let ctx = workload.packet();
                let action = workload.action::<Tc>();
                tally.observe(Tc::NAME, Observed::from_result(&tc.record_action(&ctx, action)));
            }
            if let Some(signal) = self.signal.as_mut() {
                let observed = match signal.try_record(&workload.kill_event()) {
                    Ok(EventOutcome::Handled) => Observed::Counted,
                    Ok(EventOutcome::Ignored) => Observed::Ignored,
                    Err(e) => Observed::Rejected(e.reason()),
                };
                tally.observe("tracepoint", observed);
            }
            if let Some(kprobe) = self.kprobe.as_mut() {
                tally.observe("kprobe", Observed::from_result(&kprobe.try_record()));
            }
            if let Some(uretprobe) = self.uretprobe.as_mut() {
                tally.observe("uretprobe", Observed::from_result(&uretprobe.try_record()));
            }
        }
    }

    /// Warns about invocations that hit a torn-down table.
    pub fn report_unavailable(&self, tally: &DriverTally) {
        for (program, counts) in &tally.programs {
            if let Some(count) = counts.rejects.get("table_unavailable") {
                warn!(
                    unit = self.unit,
                    program,
                    count,
                    "Invocations rejected because the counter table is unavailable"
                );
            }
        }
    }
}
