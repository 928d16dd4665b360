//! NVML manager implementation
//!
//! Provides the main interface for NVML initialization and device discovery.

use crate::error::NvmlError;
use crate::nvml::device::NvmlDevice;
use crate::nvml::traits::GpuManager;

use nvml_wrapper::Nvml;

/// NVML manager for GPU discovery and management
pub struct NvmlManager {
    nvml: Nvml,
}

impl NvmlManager {
    /// Initialize NVML and create a new manager
    pub fn new() -> Result<Self, NvmlError> {
        let nvml = Nvml::init().map_err(|e| match e {
            nvml_wrapper::error::NvmlError::LibloadingError(_) => NvmlError::LibraryNotFound,
            nvml_wrapper::error::NvmlError::DriverNotLoaded => {
                NvmlError::InitializationFailed("NVIDIA driver not loaded".to_string())
            }
            nvml_wrapper::error::NvmlError::NoPermission => {
                NvmlError::InsufficientPermissions("cannot open the NVIDIA driver".to_string())
            }
            other => NvmlError::InitializationFailed(other.to_string()),
        })?;

        Ok(Self { nvml })
    }
}

impl GpuManager for NvmlManager {
    type Device<'a> = NvmlDevice<'a>;

    fn device_count(&self) -> Result<u32, NvmlError> {
        self.nvml.device_count().map_err(NvmlDevice::convert_error)
    }

    fn device_by_index(&self, index: u32) -> Result<Self::Device<'_>, NvmlError> {
        let device = self.nvml.device_by_index(index).map_err(|e| match e {
            nvml_wrapper::error::NvmlError::NotFound => NvmlError::DeviceNotFound(index),
            other => NvmlDevice::convert_error(other),
        })?;

        Ok(NvmlDevice::new(device, index))
    }

    fn driver_version(&self) -> Result<String, NvmlError> {
        self.nvml
            .sys_driver_version()
            .map_err(|e| NvmlError::Unknown(e.to_string()))
    }

    fn shutdown(self) -> Result<(), NvmlError> {
        self.nvml
            .shutdown()
            .map_err(|e| NvmlError::Unknown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require actual NVIDIA hardware and drivers
    // They will be skipped if NVML is not available

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_nvml_init() {
        let manager = NvmlManager::new();
        assert!(manager.is_ok());
    }

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_device_count_and_shutdown() {
        let manager = NvmlManager::new().unwrap();
        let count = manager.device_count();
        assert!(count.is_ok());
        assert!(count.unwrap() > 0);
        assert!(manager.shutdown().is_ok());
    }
}
