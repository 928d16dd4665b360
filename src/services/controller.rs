//! Thermal controller
//!
//! Reads one device, evaluates the proportional policy and drives every fan
//! channel to the result. Read failures skip the device for this pass; a
//! permission failure on any fan aborts the whole loop.

use crate::cli::TraceFormat;
use crate::domain::{ControlDecision, ControlParameters, ThermalSample};
use crate::error::{AppError, NvmlError, Result};
use crate::nvml::GpuDevice;

use serde::Serialize;
use std::fmt;

/// Which read made the controller skip a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Temperature could not be read
    Temperature(NvmlError),
    /// Current fan speed could not be read
    FanSpeed(NvmlError),
    /// Fan count could not be read
    FanCount(NvmlError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Temperature(e) => write!(f, "temperature unreadable: {}", e),
            SkipReason::FanSpeed(e) => write!(f, "fan speed unreadable: {}", e),
            SkipReason::FanCount(e) => write!(f, "fan count unreadable: {}", e),
        }
    }
}

/// Result of controlling one device for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// The decision was sent to the fans
    Applied {
        sample: ThermalSample,
        decision: ControlDecision,
        /// Channels that rejected the new speed
        failed_fans: u32,
    },
    /// Nothing was written this pass
    Skipped(SkipReason),
}

#[derive(Serialize)]
struct TraceRecord<'a> {
    gpu: u32,
    #[serde(flatten)]
    decision: &'a ControlDecision,
}

/// Proportional temperature controller for a single device
#[derive(Debug, Clone)]
pub struct ThermalController {
    params: ControlParameters,
    trace_format: TraceFormat,
}

impl ThermalController {
    /// Create a new controller
    pub fn new(params: ControlParameters, trace_format: TraceFormat) -> Self {
        Self {
            params,
            trace_format,
        }
    }

    /// Run read, compute and write on `device`
    ///
    /// # Errors
    /// Returns `AppError::PermissionDenied` as soon as a fan refuses a speed
    /// for lack of privilege. Remaining fans are left untouched.
    pub fn control<D: GpuDevice>(&self, device: &mut D) -> Result<DeviceOutcome> {
        let gpu = device.index();

        let temperature = match device.temperature() {
            Ok(t) => t,
            Err(e) => return Ok(DeviceOutcome::Skipped(SkipReason::Temperature(e))),
        };

        // The driver reports one duty cycle per board; fan 0 stands for it
        let current_speed = match device.fan_speed(0) {
            Ok(s) => s,
            Err(e) => return Ok(DeviceOutcome::Skipped(SkipReason::FanSpeed(e))),
        };

        let decision = self.params.decide(temperature, current_speed);
        self.trace(gpu, &decision);

        let fan_count = match device.fan_count() {
            Ok(n) => n,
            Err(e) => return Ok(DeviceOutcome::Skipped(SkipReason::FanCount(e))),
        };

        let mut failed_fans = 0;
        for fan_idx in 0..fan_count {
            match device.set_fan_speed(fan_idx, decision.target_speed) {
                Ok(()) => {}
                Err(e) if e.is_permission_denied() => {
                    return Err(AppError::PermissionDenied { gpu, fan: fan_idx });
                }
                Err(e) => {
                    failed_fans += 1;
                    log::warn!(
                        "Failed to set fan speed on GPU {} fan {}: {}",
                        gpu,
                        fan_idx,
                        e
                    );
                }
            }
        }

        Ok(DeviceOutcome::Applied {
            sample: ThermalSample::new(temperature, current_speed, fan_count),
            decision,
            failed_fans,
        })
    }

    fn trace(&self, gpu: u32, decision: &ControlDecision) {
        match self.trace_format {
            TraceFormat::Text => {
                if let (Some(temperature_delta), Some(speed_delta)) =
                    (decision.temperature_delta, decision.speed_delta)
                {
                    log::info!("GPU {}: temperature_delta: {}", gpu, temperature_delta);
                    log::info!("GPU {}: speed_delta: {}", gpu, speed_delta);
                    log::info!("GPU {}: target_speed: {}", gpu, decision.target_speed);
                } else {
                    log::debug!(
                        "GPU {}: no previous fan speed, starting at {}",
                        gpu,
                        decision.target_speed
                    );
                }
            }
            TraceFormat::Json => {
                let record = TraceRecord { gpu, decision };
                match serde_json::to_string(&record) {
                    Ok(line) => log::info!("{}", line),
                    Err(e) => log::warn!("GPU {}: failed to encode trace: {}", gpu, e),
                }
            }
        }
    }
}
