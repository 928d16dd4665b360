//! Trait definitions for GPU operations
//!
//! These traits abstract over NVML to enable testing with mocks.

use crate::domain::{FanSpeed, Temperature};
use crate::error::NvmlError;

/// Trait for GPU device operations
///
/// A device is a handle borrowed from its [`GpuManager`]. Handles are
/// resolved again on every pass and never outlive the manager.
pub trait GpuDevice {
    /// Get the GPU index this handle was resolved from
    fn index(&self) -> u32;

    // Temperature operations
    /// Get current GPU core temperature
    fn temperature(&self) -> Result<Temperature, NvmlError>;

    // Fan operations
    /// Get the number of independently controllable fans
    ///
    /// May return 1 when every fan shares a single controller.
    fn fan_count(&self) -> Result<u32, NvmlError>;

    /// Get current fan speed for a specific fan
    fn fan_speed(&self, fan_idx: u32) -> Result<FanSpeed, NvmlError>;

    /// Set fan speed for a specific fan (switches it to manual control)
    ///
    /// Fails with `NvmlError::InsufficientPermissions` without root.
    fn set_fan_speed(&mut self, fan_idx: u32, speed: FanSpeed) -> Result<(), NvmlError>;

    /// Hand a fan back to the driver's automatic control
    fn restore_default_fan_speed(&mut self, fan_idx: u32) -> Result<(), NvmlError>;
}

/// Trait for managing multiple GPUs
///
/// This trait provides methods for discovering and accessing GPU devices.
pub trait GpuManager {
    /// The device handle type, borrowing from the manager
    type Device<'a>: GpuDevice
    where
        Self: 'a;

    /// Get the number of GPU devices
    fn device_count(&self) -> Result<u32, NvmlError>;

    /// Get a device by index
    fn device_by_index(&self, index: u32) -> Result<Self::Device<'_>, NvmlError>;

    /// Get driver version
    fn driver_version(&self) -> Result<String, NvmlError>;

    /// Release the management library
    fn shutdown(self) -> Result<(), NvmlError>
    where
        Self: Sized;
}
