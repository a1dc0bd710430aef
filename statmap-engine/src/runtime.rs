/*!
# Runtime

Drives the counting programs on one worker per processing unit and reads
the pinned tables back.

- `run_simulation` runs a fixed number of seeded invocations per unit on
  scoped OS threads and returns the driver-side tally next to what the
  tables ended up holding.
- `run_watch` keeps the units busy until Ctrl-C (or a deadline) while an
  interval ticker logs the summed counts and refreshes the metrics.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, info_span, instrument, warn, Instrument};

use statmap_config::StatmapConfig;
use statmap_core::registry::PinRegistry;
use statmap_core::trace::TraceRecord;
use statmap_telemetry::{EventLogger, MetricsRecorder};

use crate::error::EngineError;
use crate::reader::{StatsReader, StatsReport};
use crate::subsystem::{Subsystem, UnitPrograms};
use crate::tally::DriverTally;
use crate::workload::Workload;

/// Invocations per program between two pauses of a watch worker.
const WATCH_BATCH: usize = 64;

/// Raises the workers' stop flag when dropped, so early returns stop them too.
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub tally: DriverTally,
    pub stats: StatsReport,
    pub trace_records: Vec<TraceRecord>,
    pub trace_dropped: u64,
}

fn attach_all(subsystem: &Subsystem) -> Result<Vec<UnitPrograms>, EngineError> {
    (0..subsystem.num_units())
        .map(|unit| subsystem.attach_unit(unit))
        .collect()
}

/// Drives `events` invocations of every enabled program on every unit.
#[instrument(level = "info", name = "run_simulation", skip(config, metrics))]
pub fn run_simulation(
    config: &StatmapConfig,
    events: usize,
    seed: u64,
    metrics: &MetricsRecorder,
) -> Result<SimulationReport, EngineError> {
    let registry = Arc::new(PinRegistry::new(&config.tables.pin_root));
    let subsystem = Subsystem::start(config, Arc::clone(&registry))?;
    let units = attach_all(&subsystem)?;
    info!(units = units.len(), events, seed, "Starting simulation");

    let tally = thread::scope(|scope| -> Result<DriverTally, EngineError> {
        let mut handles = Vec::with_capacity(units.len());
        for mut programs in units {
            let mut workload = Workload::new(
                &config.workload,
                subsystem.target_signal(),
                Workload::unit_seed(seed, programs.unit()),
            );
            let handle = thread::Builder::new()
                .name(format!("unit-{}", programs.unit()))
                .spawn_scoped(scope, move || {
                    let mut tally = DriverTally::default();
                    programs.drive(&mut workload, events, &mut tally);
                    programs.report_unavailable(&tally);
                    tally
                })?;
            handles.push(handle);
        }

        let mut total = DriverTally::default();
        for handle in handles {
            let tally = handle
                .join()
                .map_err(|_| EngineError::Worker("unit thread panicked".into()))?;
            total.merge(&tally);
        }
        Ok(total)
    })?;

    let reader = StatsReader::new(Arc::clone(&registry));
    let stats = reader.report()?;
    tally.export(metrics);
    reader.export(metrics)?;

    let trace_records = subsystem.trace().drain();
    let trace_dropped = subsystem.trace().dropped();
    metrics.set_trace_dropped(trace_dropped);

    subsystem.shutdown()?;
    info!(trace_records = trace_records.len(), trace_dropped, "Simulation finished");

    Ok(SimulationReport {
        tally,
        stats,
        trace_records,
        trace_dropped,
    })
}

/// Keeps every unit busy until Ctrl-C or until `duration` has passed.
///
/// Returns the last reading of the tables taken before they are unpinned.
#[instrument(level = "info", name = "run_watch", skip(config, metrics))]
pub async fn run_watch(
    config: &StatmapConfig,
    duration: Option<Duration>,
    metrics: &MetricsRecorder,
) -> Result<StatsReport, EngineError> {
    let registry = Arc::new(PinRegistry::new(&config.tables.pin_root));
    let subsystem = Subsystem::start(config, Arc::clone(&registry))?;
    let stop = Arc::new(AtomicBool::new(false));
    let stop_guard = StopOnDrop(Arc::clone(&stop));
    let pause = Duration::from_millis(config.workload.batch_pause_ms);
    let seed = rand::random::<u64>();

    let mut workers = Vec::new();
    for mut programs in attach_all(&subsystem)? {
        let stop = Arc::clone(&stop);
        let mut workload = Workload::new(
            &config.workload,
            subsystem.target_signal(),
            Workload::unit_seed(seed, programs.unit()),
        );
        let span = info_span!("unit_worker", unit = programs.unit());
        workers.push(tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let mut tally = DriverTally::default();
            while !stop.load(Ordering::Relaxed) {
                programs.drive(&mut workload, WATCH_BATCH, &mut tally);
                if !pause.is_zero() {
                    thread::sleep(pause);
                }
            }
            programs.report_unavailable(&tally);
            tally
        }));
    }
    info!(units = workers.len(), "Watching counter tables");

    let reader = StatsReader::new(Arc::clone(&registry));
    let mut ticker = tokio::time::interval(Duration::from_millis(config.reader.interval_ms));
    let stopped = wait_for_stop(duration).instrument(info_span!("stop_signal"));
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = reader.report()?;
                report.log();
                reader.export(metrics)?;
                EventLogger::log_trace_records("trace_pipe", &subsystem.trace().drain());
                metrics.set_trace_dropped(subsystem.trace().dropped());
            }
            _ = &mut stopped => break,
        }
    }

    drop(stop_guard);
    let mut total = DriverTally::default();
    for worker in workers {
        total.merge(&worker.await?);
    }
    total.export(metrics);

    let report = reader.report()?;
    report.log();
    reader.export(metrics)?;
    subsystem.shutdown()?;
    Ok(report)
}

async fn wait_for_stop(duration: Option<Duration>) {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Ctrl-C received, stopping"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        },
        _ = deadline => info!("Watch duration elapsed"),
    }
}
