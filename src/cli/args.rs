//! CLI argument definitions using clap derive
//!
//! The daemon has a single run mode; the flags only tune logging and allow a
//! one-shot pass.

use clap::{Parser, ValueEnum};

/// NVML fan control daemon
///
/// Keeps NVIDIA GPU fans in a safe band by nudging their duty cycle toward a
/// 50°C target every few seconds. Automatic fan control is restored on exit.
#[derive(Parser, Debug)]
#[command(name = "nvfan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// How control decisions are written to the log
    #[arg(long, value_enum, default_value = "text")]
    pub trace_format: TraceFormat,

    /// Run a single pass over all GPUs, restore automatic control and exit
    #[arg(long)]
    pub once: bool,
}

/// Rendering of the per-device control trace
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceFormat {
    /// One human-readable line per computed value
    #[default]
    Text,
    /// One JSON object per decision
    Json,
}
