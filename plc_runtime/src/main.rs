//! # PLC Scan Runtime
//!
//! Loads `plc.toml`, instantiates an I/O driver and a program, performs RT
//! setup and runs the scan cycle until Ctrl-C or a cycle limit.

use clap::Parser;
use clap::builder::PossibleValuesParser;
use plc_common::config::LogLevel;
use plc_common::consts::DEFAULT_CONFIG_PATH;
use plc_hal::DriverRegistry;
use plc_runtime::config::{LoadedConfig, load_config};
use plc_runtime::cycle::{ScanCycle, rt_setup};
use plc_runtime::programs::{self, PROGRAM_NAMES};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// PLC scan runtime
#[derive(Parser, Debug)]
#[command(name = "plc_runtime")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Deterministic PLC scan cycle between physical I/O and a logic program")]
struct Args {
    /// Path to the runtime configuration (plc.toml).
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Built-in program to run.
    #[arg(long, default_value = "loopback", value_parser = PossibleValuesParser::new(PROGRAM_NAMES))]
    program: String,

    /// I/O driver name.
    #[arg(long, default_value = "simulation")]
    driver: String,

    /// Stop after N scans (default: run until Ctrl-C).
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// CPU core to pin the scan thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // The config file picks the default log level, so load it first.
    let loaded = load_config(&args.config);
    let level = loaded
        .as_ref()
        .map_or(LogLevel::Info, |cfg| cfg.plc.shared.log_level);
    setup_tracing(&args, level);

    info!("PLC runtime v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|cfg| run(&args, &cfg));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("PLC runtime shutdown complete");
}

fn run(args: &Args, loaded: &LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    loaded.dump_config();

    let registry = DriverRegistry::with_builtin_drivers();
    let driver = registry.create_driver(&args.driver)?;

    let vars = loaded
        .located
        .clone()
        .unwrap_or_else(|| programs::variables_of(&loaded.bindings));
    let program = programs::create_program(&args.program, vars)
        .ok_or_else(|| format!("unknown program '{}'", args.program))?;

    let mut cycle = ScanCycle::from_config(loaded, driver, program)?;
    cycle.start()?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    info!("Entering scan loop");
    let outcome = cycle.run(&running, args.cycles);
    cycle.shutdown()?;
    outcome?;

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
