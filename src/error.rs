//! Unified error types for nvfan
//!
//! Only initialization, enumeration and permission failures terminate the
//! daemon. Sensor read failures and restore failures are absorbed where they
//! are detected and never become an [`AppError`].

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The management library could not be started
    #[error("Failed to start NVML: {0}")]
    Initialization(NvmlError),

    /// The device count could not be obtained
    #[error("Failed to enumerate GPUs: {0}")]
    Enumeration(NvmlError),

    /// Setting a fan speed was refused for lack of privilege
    #[error("Permission denied while setting fan {fan} on GPU {gpu}. Fan control requires root privileges")]
    PermissionDenied { gpu: u32, fan: u32 },

    /// Signal handlers could not be installed
    #[error("Failed to install signal handlers: {0}")]
    SignalHandler(String),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),
}

/// Errors from NVML wrapper operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmlError {
    /// Failed to initialize NVML library
    #[error("Failed to initialize NVML: {0}")]
    InitializationFailed(String),

    /// NVML library not found
    #[error("NVML library not found. Is the NVIDIA driver installed?")]
    LibraryNotFound,

    /// Device not found at index
    #[error("GPU device not found at index {0}")]
    DeviceNotFound(u32),

    /// Operation not supported by this GPU
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// GPU is lost (fallen off bus, etc.)
    #[error("GPU is lost or has become inaccessible")]
    GpuLost,

    /// Invalid argument passed to NVML
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The driver did not answer in time
    #[error("NVML call timed out")]
    Timeout,

    /// Unknown NVML error
    #[error("NVML error: {0}")]
    Unknown(String),
}

impl NvmlError {
    /// Whether this error means the caller lacks privileges
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, NvmlError::InsufficientPermissions(_))
    }
}

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid fan speed value (must be 0-100)
    #[error("Invalid fan speed: {0}% (must be 0-100)")]
    InvalidFanSpeed(u8),

    /// Speed band is empty or out of range
    #[error("Invalid speed band: min {min}% must not exceed max {max}%")]
    InvalidSpeedBand { min: u8, max: u8 },
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
