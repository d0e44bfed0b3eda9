//! depot — command-line driver for the depot and workshop models.
//!
//! ```text
//! depot depot    --config demos/depot/config/depot.json --out output/depot
//! depot workshop --config demos/depot/config/workshop.json
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dm_core::Tick;
use dm_depot::{CompletionRecord, Depot, DepotConfig, DepotObserver, DepotSnapshot, RunReport, RunWarning};
use dm_output::{CsvWriter, DepotOutputObserver, OutputWriter};
use dm_workshop::{Workshop, WorkshopConfig};

#[derive(Parser)]
#[command(version, about = "Maintenance depot simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the maintenance-admission depot model
    Depot(DepotArgs),
    /// Run the equipment-availability workshop model
    Workshop(WorkshopArgs),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Csv,
    #[cfg(feature = "sqlite")]
    Sqlite,
    #[cfg(feature = "parquet")]
    Parquet,
}

#[derive(Args)]
struct DepotArgs {
    /// Depot configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,
    /// Directory for completion and snapshot files
    #[arg(short, long, default_value = "output/depot")]
    out: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,
    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,
    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct WorkshopArgs {
    /// Workshop configuration (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Depot(args) => run_depot(args),
        Command::Workshop(args) => run_workshop(args),
    }
}

// ── depot ─────────────────────────────────────────────────────────────────────

fn run_depot(args: DepotArgs) -> Result<()> {
    let mut config = DepotConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.sim.seed = seed;
    }
    let mut depot = Depot::from_config(&config)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let t0 = Instant::now();
    let report = match args.format {
        Format::Csv => run_with(&mut depot, CsvWriter::new(&args.out)?)?,
        #[cfg(feature = "sqlite")]
        Format::Sqlite => run_with(&mut depot, dm_output::SqliteWriter::new(&args.out)?)?,
        #[cfg(feature = "parquet")]
        Format::Parquet => run_with(&mut depot, dm_output::ParquetWriter::new(&args.out)?)?,
    };
    info!(elapsed_s = t0.elapsed().as_secs_f64(), out = %args.out.display(), "output written");

    print_depot_report(&report);
    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(())
}

fn run_with<W: OutputWriter>(depot: &mut Depot, writer: W) -> Result<RunReport> {
    let mut obs = Progress { inner: DepotOutputObserver::new(writer), completions: 0 };
    let report = depot.run(&mut obs)?;
    if let Some(e) = obs.inner.take_error() {
        warn!(error = %e, "output incomplete");
    }
    Ok(report)
}

/// Counts completions on top of the output observer.
struct Progress<W: OutputWriter> {
    inner:       DepotOutputObserver<W>,
    completions: u64,
}

impl<W: OutputWriter> DepotObserver for Progress<W> {
    fn on_completion(&mut self, record: &CompletionRecord) {
        self.completions += 1;
        self.inner.on_completion(record);
    }

    fn on_snapshot(&mut self, snapshot: &DepotSnapshot) {
        self.inner.on_snapshot(snapshot);
    }

    fn on_warning(&mut self, warning: &RunWarning) {
        warn!(%warning, "run warning");
    }

    fn on_sim_end(&mut self, final_tick: Tick, report: &RunReport) {
        info!(tick = %final_tick, completions = self.completions, "run ended");
        self.inner.on_sim_end(final_tick, report);
    }
}

fn print_depot_report(r: &RunReport) {
    println!();
    println!("Ticks simulated     : {}", r.ticks);
    println!("Requests raised     : {}", r.requests_raised);
    println!("Completions         : {} ({:.1}%)", r.completions, r.performance_pct);
    println!("Tolerance overrides : {}", r.overrides);
    println!("Peak staff          : {}", r.peak_staff);
    println!("Mean occupancy      : {:.2}", r.mean_occupancy);
    println!("Timetable met       : {:.1}% of ticks", r.timetable_met_pct);
    println!();
    println!("{:<20} {:>12}", "Activity", "Units");
    println!("{}", "-".repeat(33));
    for (name, units) in &r.units_maintained {
        println!("{name:<20} {units:>12}");
    }
    println!();
    println!("{:<20} {:>12}", "Road", "Utilisation");
    println!("{}", "-".repeat(33));
    for (name, pct) in &r.road_utilisation_pct {
        println!("{name:<20} {pct:>11.1}%");
    }
    if !r.outstanding.is_empty() {
        println!();
        println!("{} requests outstanding at the horizon", r.outstanding.len());
    }
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

// ── workshop ──────────────────────────────────────────────────────────────────

fn run_workshop(args: WorkshopArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => WorkshopConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WorkshopConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let report = Workshop::new(&config)?.run()?;

    println!();
    println!("{:<10} {:>10} {:>10} {:>8} {:>13}", "Machine", "Uptime", "Downtime", "Parts", "Availability");
    println!("{}", "-".repeat(55));
    for m in &report.machines {
        println!(
            "{:<10} {:>10} {:>10} {:>8} {:>13.4}",
            m.machine.0, m.uptime, m.downtime, m.parts, m.availability
        );
    }
    println!();
    println!("Series availability : {:.4}", report.series_availability);
    println!("Other jobs done     : {} ({} preempted)", report.other_jobs_done, report.other_jobs_preempted);
    Ok(())
}
