//! Device directory
//!
//! Counts GPUs and resolves a fresh handle per index on every pass.

use crate::error::{AppError, Result};
use crate::nvml::GpuManager;

/// Read-only view over the devices a manager exposes
pub struct DeviceDirectory<'m, M: GpuManager> {
    manager: &'m M,
}

impl<'m, M: GpuManager> DeviceDirectory<'m, M> {
    /// Create a directory over `manager`
    pub fn new(manager: &'m M) -> Self {
        Self { manager }
    }

    /// Number of devices present
    ///
    /// # Errors
    /// Returns `AppError::Enumeration` if the driver cannot report a count.
    pub fn count(&self) -> Result<u32> {
        self.manager.device_count().map_err(AppError::Enumeration)
    }

    /// Resolve the handle at `index`, or `None` to skip it this pass
    pub fn get(&self, index: u32) -> Option<M::Device<'m>> {
        match self.manager.device_by_index(index) {
            Ok(device) => Some(device),
            Err(e) => {
                log::debug!("GPU {}: handle unavailable, skipping: {}", index, e);
                None
            }
        }
    }
}
