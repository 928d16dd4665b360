//! Thermal domain types
//!
//! Provides the temperature type and the per-iteration sample of one device.

use crate::domain::FanSpeed;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Temperature(i32);

impl Temperature {
    /// Create a new Temperature
    pub const fn new(celsius: i32) -> Self {
        Self(celsius)
    }

    /// Get the temperature in Celsius
    #[inline]
    pub const fn as_celsius(&self) -> i32 {
        self.0
    }

    /// Signed difference `self - other` in degrees
    #[inline]
    pub const fn delta_from(&self, other: Temperature) -> i32 {
        self.0 - other.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C", self.0)
    }
}

impl From<i32> for Temperature {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<u32> for Temperature {
    fn from(value: u32) -> Self {
        Self::new(value.min(i32::MAX as u32) as i32)
    }
}

impl From<Temperature> for i32 {
    fn from(temp: Temperature) -> Self {
        temp.0
    }
}

/// What the controller read from one device in one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThermalSample {
    /// GPU core temperature
    pub temperature: Temperature,
    /// Duty cycle currently reported by the board
    pub current_speed: FanSpeed,
    /// Independently settable fan channels (1 may cover several fans)
    pub fan_count: u32,
}

impl ThermalSample {
    /// Create a new sample
    pub fn new(temperature: Temperature, current_speed: FanSpeed, fan_count: u32) -> Self {
        Self {
            temperature,
            current_speed,
            fan_count,
        }
    }
}
