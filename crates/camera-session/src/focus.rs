//! Auto-focus helper

use crate::driver::CameraDevice;
use tracing::{debug, warn};

/// Keeps the driver's auto-focus cycle running while preview is on.
///
/// Created when preview starts and dropped when it stops. Focus failures are
/// logged and otherwise ignored.
#[derive(Debug, Default)]
pub struct AutoFocus {
    active: bool,
}

impl AutoFocus {
    /// Start focusing, if the device supports it
    pub fn start<D: CameraDevice>(device: &mut D, supported: bool) -> Option<Self> {
        if !supported {
            debug!("Auto-focus not supported; skipping");
            return None;
        }
        let mut focus = Self::default();
        match device.auto_focus() {
            Ok(()) => focus.active = true,
            Err(e) => warn!("Unexpected error while focusing: {}", e),
        }
        Some(focus)
    }

    /// Cancel any in-flight focus request
    pub fn stop<D: CameraDevice>(mut self, device: &mut D) {
        if self.active {
            if let Err(e) = device.cancel_auto_focus() {
                warn!("Unexpected error while cancelling focusing: {}", e);
            }
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
