//! nvfan - NVML-based GPU fan control daemon
//!
//! Runs the control loop until SIGINT, SIGTERM or SIGHUP, then restores
//! automatic fan control.

use clap::Parser;
use nvfan::cli::Cli;
use nvfan::domain::policy::{
    ControlParameters, INITIAL_SPEED, ITERATION_PAUSE, MAX_SPEED, MIN_SPEED, TARGET_TEMPERATURE,
};
use nvfan::error::AppError;
use nvfan::lifecycle::{exit_code, install_signal_handlers, run_with, StopSignal};
use nvfan::nvml::NvmlManager;
use nvfan::services::{LoopExit, LoopOptions};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.format_timestamp(None).init();

    let result = run(&cli);
    match &result {
        Ok(exit) => log::info!("Stopped ({})", exit),
        Err(e) => {
            print_error(e);
            log::info!("Stopped");
        }
    }
    std::process::exit(exit_code(&result));
}

fn run(cli: &Cli) -> Result<LoopExit, AppError> {
    log::info!("Started");

    let stop = StopSignal::new();
    install_signal_handlers(&stop)?;

    let params = ControlParameters::new(
        TARGET_TEMPERATURE,
        INITIAL_SPEED,
        MIN_SPEED,
        MAX_SPEED,
        ITERATION_PAUSE,
    )?;
    let options = LoopOptions::new(params)
        .trace_format(cli.trace_format)
        .single_use(cli.once);

    run_with(NvmlManager::new, &stop, options)
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Initialization(nvfan::error::NvmlError::LibraryNotFound) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      On Linux, install the nvidia-utils package.");
        }
        AppError::PermissionDenied { .. } => {
            eprintln!();
            eprintln!("Hint: Fan control needs root. Run with sudo or as a system service.");
        }
        AppError::Enumeration(_) => {
            eprintln!();
            eprintln!("Hint: Check 'nvidia-smi' for GPU detection.");
        }
        _ => {}
    }
}
