use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use statmap_config::StatmapConfig;
use statmap_core::prelude::*;
use statmap_engine::{run_simulation, run_watch, SimulationReport};
use statmap_telemetry::{EventLogger, MetricsRecorder};

#[derive(Parser)]
#[command(name = "statmap", version, about)]
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive every enabled program with seeded synthetic traffic
    Simulate(SimulateArgs),
    /// Keep the programs running and poll the tables periodically
    Watch(WatchArgs),
    /// List the table definitions and their pin paths
    Maps,
    /// Print the effective configuration as YAML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Invocations per program and processing unit
    #[arg(long, default_value_t = 1000)]
    pub events: usize,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Print the Prometheus exposition after the run
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration: Option<u64>,
    /// Print the Prometheus exposition after the run
    #[arg(long)]
    pub metrics: bool,
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let config = StatmapConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    EventLogger::init(&config.telemetry.log_level).context("Failed to install logger")?;
    let metrics = MetricsRecorder::new()?;

    match cli.command {
        Commands::Simulate(args) => {
            let report = run_simulation(&config, args.events, args.seed, &metrics)?;
            summarize(&report);
            if args.metrics {
                println!("{}", metrics.gather_metrics()?);
            }
        }
        Commands::Watch(args) => {
            run_watch(&config, args.duration.map(Duration::from_secs), &metrics).await?;
            if args.metrics {
                println!("{}", metrics.gather_metrics()?);
            }
        }
        Commands::Maps => print_maps(&config.tables.pin_root, config.tables.num_units),
        Commands::Config => print!("{}", serde_yaml::to_string(&config)?),
    }
    Ok(())
}

fn summarize(report: &SimulationReport) {
    for (program, tally) in &report.tally.programs {
        info!(
            program,
            invocations = tally.invocations,
            counted = tally.counted,
            ignored = tally.ignored,
            rejected = tally.rejected(),
            "Program tally"
        );
        for (reason, count) in &tally.rejects {
            info!(program, reason, count, "Rejected invocations");
        }
    }
    report.stats.log();
    EventLogger::log_trace_records("trace_pipe", &report.trace_records);
    if report.trace_dropped > 0 {
        info!(dropped = report.trace_dropped, "Trace pipe overflowed");
    }
}

fn print_maps(pin_root: &str, num_units: usize) {
    let registry = PinRegistry::new(Path::new(pin_root));
    let maps = [
        (&XDP_STATS_MAP, "PacketRecord"),
        (&TC_STATS_MAP, "PacketRecord"),
        (&TRACEPOINT_STATS_MAP, "CallRecord"),
        (&KPROBE_STATS_MAP, "CallRecord"),
        (&URETPROBE_STATS_MAP, "CallRecord"),
    ];
    println!("{:<22} {:>8} {:>6} {:<13} PATH", "NAME", "ENTRIES", "UNITS", "RECORD");
    for (def, record) in maps {
        println!(
            "{:<22} {:>8} {:>6} {:<13} {}",
            def.name,
            def.max_entries,
            num_units,
            record,
            registry.pin_path(def.name).display()
        );
    }
}
