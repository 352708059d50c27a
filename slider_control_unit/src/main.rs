//! # Slider Control Unit
//!
//! Fixed-rate motion controller for a 4-axis camera slider.
//!
//! Loads one TOML configuration, restores saved banks, starts the bank
//! persistence worker, performs RT setup and enters the cycle loop until
//! SIGINT/SIGTERM. Transports attach through the command sender and the
//! position telemetry channel.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;

use clap::Parser;
use slider_common::consts::DEFAULT_CONFIG_PATH;
use slider_common::hal::storage::BankStorage;
use slider_control_unit::config::{LoadedConfig, load_config};
use slider_control_unit::cycle::{CycleRunner, rt_setup};
use slider_control_unit::persistence::PersistenceHandle;
use slider_hal::{FileBankStorage, SimulatedDriver};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Slider Control Unit: 4-axis camera slider motion controller
#[derive(Parser, Debug)]
#[command(name = "slider_control_unit")]
#[command(version)]
#[command(about = "Fixed-rate motion controller for a 4-axis camera slider")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// CPU core to pin the cycle thread to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
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

    // The log level in the config file is only known after loading it.
    let loaded = match load_config(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            setup_tracing(&args, None);
            error!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    setup_tracing(&args, Some(&loaded));

    info!("Slider Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, loaded) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Slider Control Unit shutdown complete");
}

fn run(args: &Args, loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let controller = &loaded.controller;
    info!(
        "Config OK: device='{}', cycle={}µs, telemetry={}ms, auto_cancel={}",
        controller.shared.device_name,
        controller.cycle.cycle_time_us,
        controller.cycle.telemetry_interval_ms,
        controller.motion.auto_cancel,
    );

    let mut storage = FileBankStorage::new(&controller.storage.bank_file);
    let banks = match storage.load_all() {
        Ok(banks) => banks,
        Err(e) => {
            warn!("bank file unreadable ({e}), starting with empty banks");
            Vec::new()
        }
    };
    let persistence = PersistenceHandle::spawn(Box::new(storage))?;

    let (mut runner, _commands, _telemetry) =
        CycleRunner::new(&loaded, SimulatedDriver::new(), banks, Some(persistence));

    if let Err(e) = runner.controller_mut().apply_driver_configs() {
        warn!("driver settings not applied: {e}");
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let running = runner.running();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    runner.run()?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
///
/// `RUST_LOG` wins over the configured level; `--verbose` forces DEBUG.
fn setup_tracing(args: &Args, loaded: Option<&LoadedConfig>) {
    let default = loaded
        .map(|l| l.controller.shared.log_level.as_directive())
        .unwrap_or("info");
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if args.verbose {
        filter = filter.add_directive(Level::DEBUG.into());
    }

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
