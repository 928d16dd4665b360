//! Process lifecycle
//!
//! Owns the cancellation flag set by termination signals and the drain
//! sequence that runs after the control loop: restore automatic fan control,
//! then release NVML.

use crate::error::{AppError, NvmlError, Result};
use crate::nvml::GpuManager;
use crate::services::{restore_all, ControlLoop, LoopExit, LoopOptions};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between signal delivery and the control loop
///
/// Starts cleared, is set at most once in effect, and is never reset.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the control loop to stop at the next iteration boundary
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `stop`
///
/// A hangup is treated as a stop request so the fans still get handed back
/// to the driver when the controlling terminal goes away. Can only succeed
/// once per process.
pub fn install_signal_handlers(stop: &StopSignal) -> Result<()> {
    let stop = stop.clone();
    ctrlc::set_handler(move || {
        if !stop.is_requested() {
            log::info!("Received shutdown signal");
        }
        stop.request();
    })
    .map_err(|e| AppError::SignalHandler(e.to_string()))
}

/// Initialize the management library with `init`, then [`supervise`] it
///
/// Nothing is restored when initialization fails, since no fan was touched.
pub fn run_with<M, F>(init: F, stop: &StopSignal, options: LoopOptions) -> Result<LoopExit>
where
    M: GpuManager,
    F: FnOnce() -> std::result::Result<M, NvmlError>,
{
    let manager = init().map_err(AppError::Initialization)?;
    match manager.driver_version() {
        Ok(version) => log::info!("NVML initialized (driver {})", version),
        Err(_) => log::info!("NVML initialized"),
    }

    supervise(manager, stop, options)
}

/// Process exit status for a finished run
pub fn exit_code(result: &Result<LoopExit>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Run the control loop on an initialized manager and drain afterwards
///
/// Automatic fan control is restored exactly once and the manager is shut
/// down whatever way the loop ended. Neither step can turn a clean exit
/// into a failure.
pub fn supervise<M: GpuManager>(
    manager: M,
    stop: &StopSignal,
    options: LoopOptions,
) -> Result<LoopExit> {
    let outcome = ControlLoop::new(options).run(&manager, stop);

    if let Ok(exit) = &outcome {
        log::info!("Control loop finished: {}", exit);
    }

    log::info!("Restoring automatic fan control");
    let report = restore_all(&manager);
    log::info!(
        "Restored {} fan(s), {} failure(s) ignored",
        report.restored,
        report.failed
    );

    if let Err(e) = manager.shutdown() {
        log::warn!("Failed to shut down NVML: {}", e);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ControlParameters, FanSpeed};
    use crate::mock::{MockCall, MockDevice, MockManager};

    use std::time::Duration;

    fn fast_options() -> LoopOptions {
        LoopOptions::new(ControlParameters::default().with_iteration_pause(Duration::ZERO))
    }

    fn restore_calls(calls: &[MockCall]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, MockCall::RestoreDefault { .. }))
            .count()
    }

    #[test]
    fn test_stop_signal_starts_cleared() {
        let stop = StopSignal::new();
        assert!(!stop.is_requested());
    }

    #[test]
    fn test_stop_signal_is_idempotent_and_shared() {
        let stop = StopSignal::new();
        let handler_side = stop.clone();
        handler_side.request();
        handler_side.request();
        assert!(stop.is_requested());
        assert!(handler_side.is_requested());
    }

    #[test]
    fn test_supervise_cancelled_restores_then_shuts_down() {
        let stop = StopSignal::new();
        let manager = MockManager::new(2).stop_after_passes(3, stop.clone());
        let journal = manager.journal();

        let exit = supervise(manager, &stop, fast_options()).unwrap();
        assert_eq!(exit, LoopExit::Cancelled);

        let calls = journal.calls();
        // Two devices with two fans each
        assert_eq!(restore_calls(&calls), 4);
        assert_eq!(calls.last(), Some(&MockCall::Shutdown));

        let first_restore = calls
            .iter()
            .position(|c| matches!(c, MockCall::RestoreDefault { .. }))
            .unwrap();
        let last_set = calls
            .iter()
            .rposition(|c| matches!(c, MockCall::SetFanSpeed { .. }))
            .unwrap();
        assert!(last_set < first_restore);
    }

    #[test]
    fn test_supervise_permission_error_still_restores() {
        let stop = StopSignal::new();
        let manager = MockManager::with_devices(vec![
            MockDevice::new(0).denying_fan(1),
            MockDevice::new(1),
        ]);
        let journal = manager.journal();

        let result = supervise(manager, &stop, fast_options());
        assert!(matches!(result, Err(AppError::PermissionDenied { gpu: 0, fan: 1 })));

        let calls = journal.calls();
        assert_eq!(restore_calls(&calls), 4);
        assert_eq!(calls.last(), Some(&MockCall::Shutdown));
        // Second device was never touched before restoring
        assert!(!calls
            .iter()
            .any(|c| matches!(c, MockCall::SetFanSpeed { gpu: 1, .. })));
    }

    #[test]
    fn test_supervise_enumeration_error_still_shuts_down() {
        let stop = StopSignal::new();
        let manager = MockManager::new(1).failing_enumeration_after(2);
        let journal = manager.journal();

        let result = supervise(manager, &stop, fast_options());
        assert!(matches!(result, Err(AppError::Enumeration(_))));

        // Restorer cannot enumerate either; it gives up quietly
        let calls = journal.calls();
        assert_eq!(restore_calls(&calls), 0);
        assert_eq!(calls.last(), Some(&MockCall::Shutdown));
    }

    #[test]
    fn test_supervise_restore_failures_do_not_fail_exit() {
        let stop = StopSignal::new();
        stop.request();
        let manager = MockManager::with_devices(vec![MockDevice::new(0).failing_restore()])
            .failing_shutdown();
        let journal = manager.journal();

        let exit = supervise(manager, &stop, fast_options()).unwrap();
        assert_eq!(exit, LoopExit::Cancelled);

        let calls = journal.calls();
        assert_eq!(restore_calls(&calls), 2);
        assert_eq!(calls.last(), Some(&MockCall::Shutdown));
    }

    #[test]
    fn test_supervise_single_use_runs_one_pass() {
        let stop = StopSignal::new();
        let manager = MockManager::with_devices(vec![MockDevice::new(0).with_fan_speed(40)]);
        let journal = manager.journal();

        let exit = supervise(manager, &stop, fast_options().single_use(true)).unwrap();
        assert_eq!(exit, LoopExit::Completed);

        let calls = journal.calls();
        let sets: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                MockCall::SetFanSpeed { speed, .. } => Some(*speed),
                _ => None,
            })
            .collect();
        // 45°C with 40% -> 35% on both fans
        assert_eq!(sets, vec![FanSpeed::new(35).unwrap(); 2]);
        assert_eq!(restore_calls(&calls), 2);
    }

    #[test]
    fn test_run_with_initialization_failure_touches_nothing() {
        let stop = StopSignal::new();
        let manager = MockManager::new(1);
        let journal = manager.journal();

        let result = run_with(
            move || {
                drop(manager);
                Err::<MockManager, _>(NvmlError::LibraryNotFound)
            },
            &stop,
            fast_options(),
        );

        assert!(matches!(
            result,
            Err(AppError::Initialization(NvmlError::LibraryNotFound))
        ));
        assert_eq!(exit_code(&result), 1);
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn test_run_with_drives_and_drains_initialized_manager() {
        let stop = StopSignal::new();
        let manager = MockManager::new(1).stop_after_passes(1, stop.clone());
        let journal = manager.journal();

        let result = run_with(move || Ok(manager), &stop, fast_options());
        assert!(matches!(result, Ok(LoopExit::Cancelled)));
        assert_eq!(exit_code(&result), 0);

        let calls = journal.calls();
        assert_eq!(calls.first(), Some(&MockCall::DeviceCount));
        assert_eq!(restore_calls(&calls), 2);
        assert_eq!(calls.last(), Some(&MockCall::Shutdown));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(&Ok(LoopExit::Cancelled)), 0);
        assert_eq!(exit_code(&Ok(LoopExit::Completed)), 0);
        assert_eq!(
            exit_code(&Err(AppError::Initialization(NvmlError::LibraryNotFound))),
            1
        );
        assert_eq!(exit_code(&Err(AppError::Enumeration(NvmlError::GpuLost))), 1);
        assert_eq!(
            exit_code(&Err(AppError::PermissionDenied { gpu: 0, fan: 0 })),
            1
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_hangup_requests_stop() {
        // The only test that installs the process-wide handler
        let stop = StopSignal::new();
        install_signal_handlers(&stop).unwrap();

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -HUP {}", std::process::id()))
            .status()
            .unwrap();
        assert!(status.success());

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !stop.is_requested() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(stop.is_requested());
    }
}
