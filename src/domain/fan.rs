//! Fan-related domain types
//!
//! Provides the validated fan duty cycle type.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fan speed percentage (0-100)
///
/// Validated on construction to ensure the value is within valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FanSpeed(u8);

impl FanSpeed {
    /// Minimum valid fan speed
    pub const MIN: u8 = 0;
    /// Maximum valid fan speed
    pub const MAX: u8 = 100;

    /// A stopped fan, also reported when no speed has been applied yet
    pub const STOPPED: FanSpeed = FanSpeed(0);

    /// Create a new FanSpeed with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFanSpeed` if value > 100
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::InvalidFanSpeed(value));
        }
        Ok(Self(value))
    }

    /// Create a FanSpeed without validation (for internal use)
    ///
    /// Caller must ensure value <= 100
    pub(crate) const fn new_unchecked(value: u8) -> Self {
        Self(value)
    }

    /// Build a speed from a raw driver reading, saturating at 100
    ///
    /// NVML may report values above 100 on some boards.
    pub fn from_reading(raw: u32) -> Self {
        Self(raw.min(Self::MAX as u32) as u8)
    }

    /// Get the speed as a percentage value (0-100)
    #[inline]
    pub const fn as_percentage(&self) -> u8 {
        self.0
    }

    /// Whether the reading carries no usable previous duty cycle
    #[inline]
    pub const fn is_stopped(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for FanSpeed {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FanSpeed> for u8 {
    fn from(speed: FanSpeed) -> Self {
        speed.0
    }
}

impl From<FanSpeed> for u32 {
    fn from(speed: FanSpeed) -> Self {
        speed.0 as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_speed_valid() {
        assert!(FanSpeed::new(0).is_ok());
        assert!(FanSpeed::new(50).is_ok());
        assert!(FanSpeed::new(100).is_ok());
    }

    #[test]
    fn test_fan_speed_invalid() {
        assert!(FanSpeed::new(101).is_err());
        assert_eq!(FanSpeed::new(255), Err(DomainError::InvalidFanSpeed(255)));
    }

    #[test]
    fn test_fan_speed_display() {
        let speed = FanSpeed::new(75).unwrap();
        assert_eq!(speed.to_string(), "75%");
    }

    #[test]
    fn test_fan_speed_from_reading_saturates() {
        assert_eq!(FanSpeed::from_reading(42).as_percentage(), 42);
        assert_eq!(FanSpeed::from_reading(140).as_percentage(), 100);
        assert_eq!(FanSpeed::from_reading(u32::MAX).as_percentage(), 100);
    }

    #[test]
    fn test_fan_speed_stopped() {
        assert!(FanSpeed::STOPPED.is_stopped());
        assert!(FanSpeed::from_reading(0).is_stopped());
        assert!(!FanSpeed::new(1).unwrap().is_stopped());
    }

    #[test]
    fn test_fan_speed_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<FanSpeed>("80").is_ok());
        assert!(serde_json::from_str::<FanSpeed>("120").is_err());
        assert_eq!(serde_json::to_string(&FanSpeed::new(30).unwrap()).unwrap(), "30");
    }
}
