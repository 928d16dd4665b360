//! Control loop driver
//!
//! Runs the thermal controller over every GPU, pauses, and checks the stop
//! flag between iterations. Enumeration and permission failures end the
//! loop; everything else waits for the next pass.

use crate::cli::TraceFormat;
use crate::domain::ControlParameters;
use crate::error::Result;
use crate::lifecycle::StopSignal;
use crate::nvml::GpuManager;
use crate::services::{DeviceDirectory, DeviceOutcome, ThermalController};

use std::fmt;
use std::thread;

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Policy constants and pacing
    pub params: ControlParameters,
    /// Rendering of the control trace
    pub trace_format: TraceFormat,
    /// Whether to exit after one pass
    pub single_use: bool,
}

impl LoopOptions {
    /// Options for continuous operation with text tracing
    pub fn new(params: ControlParameters) -> Self {
        Self {
            params,
            trace_format: TraceFormat::default(),
            single_use: false,
        }
    }

    /// Builder: set trace format
    pub fn trace_format(mut self, format: TraceFormat) -> Self {
        self.trace_format = format;
        self
    }

    /// Builder: run exactly one pass
    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self::new(ControlParameters::default())
    }
}

/// How a loop that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested
    Cancelled,
    /// Single-use mode finished its pass
    Completed,
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::Cancelled => write!(f, "stop requested"),
            LoopExit::Completed => write!(f, "single pass completed"),
        }
    }
}

/// Tally of one pass over all devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Devices reported by the driver
    pub devices: u32,
    /// Devices whose fans were driven
    pub controlled: u32,
    /// Devices skipped this pass
    pub skipped: u32,
}

/// Control loop driver
pub struct ControlLoop {
    controller: ThermalController,
    options: LoopOptions,
}

impl ControlLoop {
    /// Create a new loop with the given options
    pub fn new(options: LoopOptions) -> Self {
        let controller = ThermalController::new(options.params, options.trace_format);
        Self {
            controller,
            options,
        }
    }

    /// Run until `stop` is requested or a fatal error occurs
    ///
    /// The flag is sampled only between iterations, so a stop takes effect
    /// after at most one pass plus one pause.
    pub fn run<M: GpuManager>(&self, manager: &M, stop: &StopSignal) -> Result<LoopExit> {
        let mut iterations: u64 = 0;
        let mut known_devices = None;

        while !stop.is_requested() {
            let summary = self.pass(manager)?;
            iterations += 1;

            if known_devices != Some(summary.devices) {
                log::info!("Controlling {} GPU(s)", summary.devices);
                known_devices = Some(summary.devices);
            }
            log::debug!(
                "Iteration {}: {} controlled, {} skipped",
                iterations,
                summary.controlled,
                summary.skipped
            );

            if self.options.single_use {
                return Ok(LoopExit::Completed);
            }

            thread::sleep(self.options.params.iteration_pause());
        }

        log::info!("Stop requested after {} iteration(s)", iterations);
        Ok(LoopExit::Cancelled)
    }

    /// Control every device once
    ///
    /// # Errors
    /// Fails on enumeration errors and on the first permission error; devices
    /// after the failing one are not visited.
    pub fn pass<M: GpuManager>(&self, manager: &M) -> Result<PassSummary> {
        let directory = DeviceDirectory::new(manager);
        let devices = directory.count()?;
        let mut summary = PassSummary {
            devices,
            ..PassSummary::default()
        };

        for index in 0..devices {
            let Some(mut device) = directory.get(index) else {
                summary.skipped += 1;
                continue;
            };

            match self.controller.control(&mut device)? {
                DeviceOutcome::Applied { .. } => summary.controlled += 1,
                DeviceOutcome::Skipped(reason) => {
                    log::debug!("GPU {}: skipped this iteration, {}", index, reason);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}
