//! Domain models for nvfan
//!
//! Types are validated on construction (fail-fast pattern).

pub mod fan;
pub mod policy;
pub mod thermal;

pub use fan::FanSpeed;
pub use policy::{ControlDecision, ControlParameters};
pub use thermal::{Temperature, ThermalSample};
