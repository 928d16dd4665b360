//! Safety restorer
//!
//! Hands every fan on every GPU back to the driver's automatic control.
//! Runs once on the way out; nothing in here can fail the process.

use crate::nvml::{GpuDevice, GpuManager};
use crate::services::DeviceDirectory;

/// Tally of a restore sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Fans returned to automatic control
    pub restored: u32,
    /// Fans or devices that could not be restored
    pub failed: u32,
}

/// Restore automatic fan control on every reachable fan, best-effort
pub fn restore_all<M: GpuManager>(manager: &M) -> RestoreReport {
    let mut report = RestoreReport::default();
    let directory = DeviceDirectory::new(manager);

    let count = match directory.count() {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Cannot restore fan control: {}", e);
            report.failed += 1;
            return report;
        }
    };

    for index in 0..count {
        let Some(mut device) = directory.get(index) else {
            report.failed += 1;
            continue;
        };

        let fan_count = match device.fan_count() {
            Ok(n) => n,
            Err(e) => {
                log::warn!("GPU {}: cannot restore fan control: {}", index, e);
                report.failed += 1;
                continue;
            }
        };

        for fan_idx in 0..fan_count {
            match device.restore_default_fan_speed(fan_idx) {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    report.failed += 1;
                    log::warn!(
                        "Failed to restore automatic control on GPU {} fan {}: {}",
                        index,
                        fan_idx,
                        e
                    );
                }
            }
        }
    }

    report
}
