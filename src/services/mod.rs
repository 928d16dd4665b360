//! Service layer for GPU fan control
//!
//! Services encapsulate device discovery, the thermal controller, the loop
//! that drives it and the restore sweep run on exit.

pub mod controller;
pub mod directory;
pub mod monitor;
pub mod restorer;

pub use controller::{DeviceOutcome, SkipReason, ThermalController};
pub use directory::DeviceDirectory;
pub use monitor::{ControlLoop, LoopExit, LoopOptions, PassSummary};
pub use restorer::{restore_all, RestoreReport};
