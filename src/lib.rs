//! nvfan - NVML-based GPU fan control daemon
//!
//! Periodically samples each GPU's temperature and moves its fan duty cycle
//! toward a target with a proportional controller. Automatic fan control is
//! handed back to the driver when the daemon stops.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`domain`]: Domain models and the control policy
//! - [`error`]: Error types
//! - [`lifecycle`]: Cancellation flag and shutdown sequence
//! - [`nvml`]: NVML abstraction layer
//! - [`services`]: Controller, control loop and restore sweep

pub mod cli;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod nvml;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
