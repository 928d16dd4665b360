//! Mock implementations for testing
//!
//! Provides mock GPU device and manager for unit testing without real hardware.
//! Every device can be told to fail a specific call, and the manager keeps a
//! journal of mutating calls so tests can check ordering.

use crate::domain::{FanSpeed, Temperature};
use crate::error::NvmlError;
use crate::lifecycle::StopSignal;
use crate::nvml::{GpuDevice, GpuManager};

use std::sync::{Arc, Mutex, RwLock};

/// A call recorded by the mock manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Device count requested
    DeviceCount,
    /// Fan speed set (recorded whether or not it succeeded)
    SetFanSpeed { gpu: u32, fan: u32, speed: FanSpeed },
    /// Fan handed back to automatic control
    RestoreDefault { gpu: u32, fan: u32 },
    /// Manager shut down
    Shutdown,
}

/// Shared view of the calls made on a [`MockManager`]
#[derive(Debug, Clone, Default)]
pub struct MockJournal {
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockJournal {
    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Snapshot of all recorded calls
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Mock GPU device for testing
#[derive(Debug)]
pub struct MockDevice {
    index: u32,
    temperature: RwLock<Temperature>,
    fan_speeds: Mutex<Vec<FanSpeed>>,
    auto_control: Mutex<Vec<bool>>,
    fail_handle: bool,
    fail_temperature: bool,
    fail_fan_speed: bool,
    fail_fan_count: bool,
    fail_restore: bool,
    denied_fan: Option<u32>,
    broken_fan: Option<u32>,
}

impl MockDevice {
    /// Create a new mock device: 45°C, two fans at 50%
    pub fn new(index: u32) -> Self {
        Self {
            index,
            temperature: RwLock::new(Temperature::new(45)),
            fan_speeds: Mutex::new(vec![FanSpeed::new_unchecked(50); 2]),
            auto_control: Mutex::new(vec![true; 2]),
            fail_handle: false,
            fail_temperature: false,
            fail_fan_speed: false,
            fail_fan_count: false,
            fail_restore: false,
            denied_fan: None,
            broken_fan: None,
        }
    }

    /// Set the mock temperature
    pub fn set_temperature(&self, temp: Temperature) {
        *self.temperature.write().unwrap() = temp;
    }

    /// Builder: set temperature
    pub fn with_temperature(self, celsius: i32) -> Self {
        self.set_temperature(Temperature::new(celsius));
        self
    }

    /// Builder: set the speed every fan currently reports
    pub fn with_fan_speed(self, percent: u8) -> Self {
        let speed = FanSpeed::from_reading(percent as u32);
        self.fan_speeds.lock().unwrap().fill(speed);
        self
    }

    /// Builder: set fan count
    pub fn with_fan_count(self, count: u32) -> Self {
        let current = self.fan_speeds.lock().unwrap().first().copied();
        let speed = current.unwrap_or(FanSpeed::new_unchecked(50));
        *self.fan_speeds.lock().unwrap() = vec![speed; count as usize];
        *self.auto_control.lock().unwrap() = vec![true; count as usize];
        self
    }

    /// Builder: the handle for this index cannot be resolved
    pub fn unresolvable(mut self) -> Self {
        self.fail_handle = true;
        self
    }

    /// Builder: temperature reads fail
    pub fn failing_temperature(mut self) -> Self {
        self.fail_temperature = true;
        self
    }

    /// Builder: fan speed reads fail
    pub fn failing_fan_speed(mut self) -> Self {
        self.fail_fan_speed = true;
        self
    }

    /// Builder: fan count reads fail
    pub fn failing_fan_count(mut self) -> Self {
        self.fail_fan_count = true;
        self
    }

    /// Builder: restoring automatic control fails
    pub fn failing_restore(mut self) -> Self {
        self.fail_restore = true;
        self
    }

    /// Builder: setting this fan fails with a permission error
    pub fn denying_fan(mut self, fan_idx: u32) -> Self {
        self.denied_fan = Some(fan_idx);
        self
    }

    /// Builder: setting this fan fails with a non-permission error
    pub fn breaking_fan(mut self, fan_idx: u32) -> Self {
        self.broken_fan = Some(fan_idx);
        self
    }

    /// Speeds currently held by each fan
    pub fn fan_speeds(&self) -> Vec<FanSpeed> {
        self.fan_speeds.lock().unwrap().clone()
    }

    /// Whether each fan is under automatic control
    pub fn auto_control(&self) -> Vec<bool> {
        self.auto_control.lock().unwrap().clone()
    }

    fn fan_count(&self) -> u32 {
        self.fan_speeds.lock().unwrap().len() as u32
    }

    fn check_fan(&self, fan_idx: u32) -> Result<(), NvmlError> {
        if fan_idx >= self.fan_count() {
            return Err(NvmlError::InvalidArgument(format!(
                "Fan {} not found (count: {})",
                fan_idx,
                self.fan_count()
            )));
        }
        Ok(())
    }
}

/// Handle to a [`MockDevice`] borrowed from its manager
pub struct MockHandle<'a> {
    device: &'a MockDevice,
    journal: &'a MockJournal,
}

impl GpuDevice for MockHandle<'_> {
    fn index(&self) -> u32 {
        self.device.index
    }

    fn temperature(&self) -> Result<Temperature, NvmlError> {
        if self.device.fail_temperature {
            return Err(NvmlError::NotSupported("temperature".to_string()));
        }
        Ok(*self.device.temperature.read().unwrap())
    }

    fn fan_count(&self) -> Result<u32, NvmlError> {
        if self.device.fail_fan_count {
            return Err(NvmlError::Unknown("fan count unavailable".to_string()));
        }
        Ok(self.device.fan_count())
    }

    fn fan_speed(&self, fan_idx: u32) -> Result<FanSpeed, NvmlError> {
        if self.device.fail_fan_speed {
            return Err(NvmlError::NotSupported("fan speed".to_string()));
        }
        self.device.check_fan(fan_idx)?;
        Ok(self.device.fan_speeds.lock().unwrap()[fan_idx as usize])
    }

    fn set_fan_speed(&mut self, fan_idx: u32, speed: FanSpeed) -> Result<(), NvmlError> {
        self.journal.record(MockCall::SetFanSpeed {
            gpu: self.device.index,
            fan: fan_idx,
            speed,
        });

        if self.device.denied_fan == Some(fan_idx) {
            return Err(NvmlError::InsufficientPermissions(
                "Insufficient permissions".to_string(),
            ));
        }
        if self.device.broken_fan == Some(fan_idx) {
            return Err(NvmlError::GpuLost);
        }
        self.device.check_fan(fan_idx)?;

        self.device.fan_speeds.lock().unwrap()[fan_idx as usize] = speed;
        self.device.auto_control.lock().unwrap()[fan_idx as usize] = false;
        Ok(())
    }

    fn restore_default_fan_speed(&mut self, fan_idx: u32) -> Result<(), NvmlError> {
        self.journal.record(MockCall::RestoreDefault {
            gpu: self.device.index,
            fan: fan_idx,
        });

        if self.device.fail_restore {
            return Err(NvmlError::InsufficientPermissions(
                "Insufficient permissions".to_string(),
            ));
        }
        self.device.check_fan(fan_idx)?;

        self.device.auto_control.lock().unwrap()[fan_idx as usize] = true;
        Ok(())
    }
}

/// Mock GPU manager for testing
pub struct MockManager {
    devices: Vec<MockDevice>,
    driver_version: String,
    journal: MockJournal,
    count_calls: Mutex<u32>,
    enumeration_budget: Option<u32>,
    stop_after: Option<(u32, StopSignal)>,
    fail_shutdown: bool,
}

impl MockManager {
    /// Create a new mock manager with the specified number of devices
    pub fn new(device_count: u32) -> Self {
        Self::with_devices((0..device_count).map(MockDevice::new).collect())
    }

    /// Create a mock manager with custom devices
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            driver_version: "535.154.05".to_string(),
            journal: MockJournal::default(),
            count_calls: Mutex::new(0),
            enumeration_budget: None,
            stop_after: None,
            fail_shutdown: false,
        }
    }

    /// Builder: device enumeration succeeds `calls` times, then fails
    pub fn failing_enumeration_after(mut self, calls: u32) -> Self {
        self.enumeration_budget = Some(calls);
        self
    }

    /// Builder: request `stop` during the `passes`-th enumeration
    pub fn stop_after_passes(mut self, passes: u32, stop: StopSignal) -> Self {
        self.stop_after = Some((passes, stop));
        self
    }

    /// Builder: shutdown reports an error
    pub fn failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Shared journal of calls made on this manager and its devices
    pub fn journal(&self) -> MockJournal {
        self.journal.clone()
    }

    /// Access a device for assertions
    pub fn device(&self, index: usize) -> &MockDevice {
        &self.devices[index]
    }

    /// Number of device count requests so far
    pub fn enumerations(&self) -> u32 {
        *self.count_calls.lock().unwrap()
    }
}

impl GpuManager for MockManager {
    type Device<'a> = MockHandle<'a>;

    fn device_count(&self) -> Result<u32, NvmlError> {
        self.journal.record(MockCall::DeviceCount);

        let calls = {
            let mut calls = self.count_calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        if let Some((passes, stop)) = &self.stop_after {
            if calls == *passes {
                stop.request();
            }
        }

        if let Some(budget) = self.enumeration_budget {
            if calls > budget {
                return Err(NvmlError::Unknown("device count unavailable".to_string()));
            }
        }

        Ok(self.devices.len() as u32)
    }

    fn device_by_index(&self, index: u32) -> Result<Self::Device<'_>, NvmlError> {
        let device = self
            .devices
            .get(index as usize)
            .ok_or(NvmlError::DeviceNotFound(index))?;

        if device.fail_handle {
            return Err(NvmlError::GpuLost);
        }

        Ok(MockHandle {
            device,
            journal: &self.journal,
        })
    }

    fn driver_version(&self) -> Result<String, NvmlError> {
        Ok(self.driver_version.clone())
    }

    fn shutdown(self) -> Result<(), NvmlError> {
        self.journal.record(MockCall::Shutdown);
        if self.fail_shutdown {
            return Err(NvmlError::Unknown("shutdown failed".to_string()));
        }
        Ok(())
    }
}
