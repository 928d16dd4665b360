//! Proportional fan control policy
//!
//! The next duty cycle is the board's current duty cycle plus the distance
//! from the target temperature, with unit gain, clamped into the speed band.
//! The hardware readback is the only state carried between iterations.

use crate::domain::{FanSpeed, Temperature};
use crate::error::DomainError;
use serde::Serialize;
use std::time::Duration;

/// Temperature the controller steers toward
pub const TARGET_TEMPERATURE: Temperature = Temperature::new(50);
/// Speed applied when the board reports no previous duty cycle
pub const INITIAL_SPEED: FanSpeed = FanSpeed::new_unchecked(30);
/// Lower bound for every computed speed
pub const MIN_SPEED: FanSpeed = FanSpeed::new_unchecked(10);
/// Upper bound for every computed speed
pub const MAX_SPEED: FanSpeed = FanSpeed::new_unchecked(80);
/// Delay between two passes over all devices
pub const ITERATION_PAUSE: Duration = Duration::from_secs(5);

/// Fixed parameters of the control loop
///
/// Fields are only set through [`ControlParameters::new`], so the speed band
/// is never inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlParameters {
    target_temperature: Temperature,
    initial_speed: FanSpeed,
    min_speed: FanSpeed,
    max_speed: FanSpeed,
    iteration_pause: Duration,
}

impl ControlParameters {
    /// Create parameters, rejecting an empty speed band
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSpeedBand` if `min_speed > max_speed`
    pub fn new(
        target_temperature: Temperature,
        initial_speed: FanSpeed,
        min_speed: FanSpeed,
        max_speed: FanSpeed,
        iteration_pause: Duration,
    ) -> Result<Self, DomainError> {
        if min_speed > max_speed {
            return Err(DomainError::InvalidSpeedBand {
                min: min_speed.as_percentage(),
                max: max_speed.as_percentage(),
            });
        }

        Ok(Self {
            target_temperature,
            initial_speed,
            min_speed,
            max_speed,
            iteration_pause,
        })
    }

    /// Temperature the controller steers toward
    pub fn target_temperature(&self) -> Temperature {
        self.target_temperature
    }

    /// Speed used when no previous duty cycle is observed
    pub fn initial_speed(&self) -> FanSpeed {
        self.initial_speed
    }

    /// Floor of the speed band
    pub fn min_speed(&self) -> FanSpeed {
        self.min_speed
    }

    /// Ceiling of the speed band
    pub fn max_speed(&self) -> FanSpeed {
        self.max_speed
    }

    /// Pause after each pass over all devices
    pub fn iteration_pause(&self) -> Duration {
        self.iteration_pause
    }

    /// Same parameters with a different pause
    pub fn with_iteration_pause(mut self, pause: Duration) -> Self {
        self.iteration_pause = pause;
        self
    }

    /// Compute the next duty cycle for a device
    ///
    /// A current speed of zero is read as "never driven" and yields
    /// `initial_speed` whatever the temperature.
    pub fn decide(&self, temperature: Temperature, current_speed: FanSpeed) -> ControlDecision {
        if current_speed.is_stopped() {
            return ControlDecision {
                temperature,
                current_speed,
                temperature_delta: None,
                speed_delta: None,
                requested_speed: None,
                target_speed: self.initial_speed,
            };
        }

        let temperature_delta = temperature.delta_from(self.target_temperature);
        let speed_delta = temperature_delta;
        let requested = i64::from(current_speed.as_percentage()) + i64::from(speed_delta);
        let clamped = requested.clamp(
            i64::from(self.min_speed.as_percentage()),
            i64::from(self.max_speed.as_percentage()),
        );

        ControlDecision {
            temperature,
            current_speed,
            temperature_delta: Some(temperature_delta),
            speed_delta: Some(speed_delta),
            requested_speed: Some(requested),
            // The band lies within 0..=100, so the clamped value fits
            target_speed: FanSpeed::new_unchecked(clamped as u8),
        }
    }
}

impl Default for ControlParameters {
    fn default() -> Self {
        Self {
            target_temperature: TARGET_TEMPERATURE,
            initial_speed: INITIAL_SPEED,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
            iteration_pause: ITERATION_PAUSE,
        }
    }
}

/// Outcome of one policy evaluation, reported in the control trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlDecision {
    /// Temperature the decision was based on
    pub temperature: Temperature,
    /// Duty cycle read back from the board
    pub current_speed: FanSpeed,
    /// Measured minus target temperature; absent on the initial step
    pub temperature_delta: Option<i32>,
    /// Change in duty cycle implied by the delta
    pub speed_delta: Option<i32>,
    /// Speed before clamping into the band
    pub requested_speed: Option<i64>,
    /// Speed to apply to every fan channel
    pub target_speed: FanSpeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed(value: u8) -> FanSpeed {
        FanSpeed::new(value).unwrap()
    }

    fn target(current: u8, temp: i32) -> u8 {
        ControlParameters::default()
            .decide(Temperature::new(temp), speed(current))
            .target_speed
            .as_percentage()
    }

    #[test]
    fn test_default_parameters() {
        let params = ControlParameters::default();
        assert_eq!(params.target_temperature().as_celsius(), 50);
        assert_eq!(params.initial_speed().as_percentage(), 30);
        assert_eq!(params.min_speed().as_percentage(), 10);
        assert_eq!(params.max_speed().as_percentage(), 80);
        assert_eq!(params.iteration_pause(), Duration::from_secs(5));
    }

    #[test]
    fn test_new_rejects_inverted_band() {
        let result = ControlParameters::new(
            TARGET_TEMPERATURE,
            INITIAL_SPEED,
            speed(60),
            speed(40),
            ITERATION_PAUSE,
        );
        assert_eq!(
            result,
            Err(DomainError::InvalidSpeedBand { min: 60, max: 40 })
        );
    }

    #[test]
    fn test_new_matches_defaults() {
        let params = ControlParameters::new(
            TARGET_TEMPERATURE,
            INITIAL_SPEED,
            MIN_SPEED,
            MAX_SPEED,
            ITERATION_PAUSE,
        )
        .unwrap();
        assert_eq!(params, ControlParameters::default());
    }

    #[test]
    fn test_single_point_band_pins_speed() {
        let params = ControlParameters::new(
            TARGET_TEMPERATURE,
            INITIAL_SPEED,
            speed(40),
            speed(40),
            ITERATION_PAUSE,
        )
        .unwrap();
        for temp in [0, 50, 100] {
            let decision = params.decide(Temperature::new(temp), speed(70));
            assert_eq!(decision.target_speed.as_percentage(), 40);
        }
    }

    #[test]
    fn test_pause_override_keeps_band() {
        let params = ControlParameters::default().with_iteration_pause(Duration::ZERO);
        assert_eq!(params.iteration_pause(), Duration::ZERO);
        assert_eq!(params.min_speed(), MIN_SPEED);
        assert_eq!(params.max_speed(), MAX_SPEED);
    }

    #[test]
    fn test_proportional_step() {
        assert_eq!(target(30, 70), 50);
        assert_eq!(target(40, 45), 35);
    }

    #[test]
    fn test_clamped_to_floor() {
        assert_eq!(target(30, 20), 10);
    }

    #[test]
    fn test_clamped_to_ceiling() {
        assert_eq!(target(75, 60), 80);
        assert_eq!(target(100, 120), 80);
    }

    #[test]
    fn test_stopped_fan_gets_initial_speed() {
        let params = ControlParameters::default();
        for temp in [-20, 0, 30, 50, 75, 110] {
            let decision = params.decide(Temperature::new(temp), FanSpeed::STOPPED);
            assert_eq!(decision.temperature_delta, None);
            assert_eq!(decision.target_speed.as_percentage(), 30);
            assert_eq!(decision.speed_delta, None);
        }
    }

    #[test]
    fn test_fixed_point_at_target_temperature() {
        for current in 10..=80 {
            assert_eq!(target(current, 50), current);
        }
    }

    #[test]
    fn test_monotonic_in_temperature() {
        let params = ControlParameters::default();
        for current in [1u8, 10, 30, 55, 80, 100] {
            let mut previous = i64::MIN;
            for temp in -10..120 {
                let decision = params.decide(Temperature::new(temp), speed(current));
                let requested = decision.requested_speed.unwrap();
                assert!(requested >= previous);
                previous = requested;
            }
        }
    }

    #[test]
    fn test_target_always_within_band() {
        let params = ControlParameters::default();
        for current in 1..=100 {
            for temp in [-40, 0, 35, 50, 65, 90, 130] {
                let decision = params.decide(Temperature::new(temp), speed(current));
                assert!(decision.target_speed >= params.min_speed());
                assert!(decision.target_speed <= params.max_speed());
            }
        }
    }

    #[test]
    fn test_decision_trace_fields() {
        let decision = ControlParameters::default().decide(Temperature::new(75), speed(60));
        assert_eq!(decision.temperature_delta, Some(25));
        assert_eq!(decision.speed_delta, Some(25));
        assert_eq!(decision.requested_speed, Some(85));
        assert_eq!(decision.target_speed.as_percentage(), 80);
    }

    #[test]
    fn test_decision_serializes() {
        let decision = ControlParameters::default().decide(Temperature::new(70), speed(30));
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"temperature_delta\":20"));
        assert!(json.contains("\"target_speed\":50"));
    }
}
